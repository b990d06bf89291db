// File: snapshotter/src/services/commands.rs
use async_trait::async_trait;
use std::io;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stderr if present, otherwise stdout, otherwise the exit code
    pub fn error_message(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else {
            match self.code {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

/// Runs external programs. The service controller only talks to the OS
/// through this trait so it can be exercised with a scripted runner.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion. Dropping the returned future
    /// must terminate the child process.
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        debug!("Executing command: {} {}", program, args.join(" "));

        let output = AsyncCommand::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_stderr() {
        let output = CommandOutput {
            success: false,
            code: Some(5),
            stdout: "partial\n".to_string(),
            stderr: "Unit geth.service not loaded.\n".to_string(),
        };
        assert_eq!(output.error_message(), "Unit geth.service not loaded.");

        let silent = CommandOutput {
            success: false,
            code: Some(3),
            ..Default::default()
        };
        assert_eq!(silent.error_message(), "exit code 3");
    }

    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let output = SystemCommandRunner
            .run("sh", &["-c".to_string(), "echo hello; exit 2".to_string()])
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.code, Some(2));
        assert_eq!(output.stdout.trim(), "hello");
    }
}
