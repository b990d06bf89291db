//! Scripted stand-in for the OS service manager

use async_trait::async_trait;
use snapshotter::services::{CommandOutput, CommandRunner};
use std::io;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Behavior {
    /// Exit 0 with the given stdout
    Succeed(String),
    /// Exit 1 with the given stderr
    Fail(String),
    /// Never finish within any reasonable timeout
    Hang(Duration),
    /// Program could not be spawned
    SpawnError,
}

/// Records every command line (`program arg1 arg2 ...`) and answers from a
/// list of rules matched by exact command line. Unmatched commands succeed
/// with empty output.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<String>>,
    rules: Mutex<Vec<(String, Behavior)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, command_line: &str, behavior: Behavior) -> &Self {
        self.rules
            .lock()
            .unwrap()
            .push((command_line.to_string(), behavior));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command_line: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == command_line).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().unwrap().push(line.clone());

        let behavior = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(rule, _)| *rule == line)
            .map(|(_, behavior)| behavior.clone());

        match behavior {
            None => Ok(CommandOutput {
                success: true,
                code: Some(0),
                ..Default::default()
            }),
            Some(Behavior::Succeed(stdout)) => Ok(CommandOutput {
                success: true,
                code: Some(0),
                stdout,
                stderr: String::new(),
            }),
            Some(Behavior::Fail(stderr)) => Ok(CommandOutput {
                success: false,
                code: Some(1),
                stdout: String::new(),
                stderr,
            }),
            Some(Behavior::Hang(duration)) => {
                tokio::time::sleep(duration).await;
                Ok(CommandOutput {
                    success: true,
                    code: Some(0),
                    ..Default::default()
                })
            }
            Some(Behavior::SpawnError) => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}: command not found", program),
            )),
        }
    }
}
