// File: snapshotter/src/services/systemctl.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::commands::CommandRunner;
use crate::constants::service::STOP_TIMEOUT;
use crate::errors::ServiceError;

/// Process behind a systemd unit, resolved only when a graceful stop fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: Option<String>,
}

pub struct ServiceController {
    runner: Arc<dyn CommandRunner>,
    use_sudo: bool,
    stop_timeout: Duration,
}

impl ServiceController {
    pub fn new(runner: Arc<dyn CommandRunner>, use_sudo: bool) -> Self {
        Self {
            runner,
            use_sudo,
            stop_timeout: STOP_TIMEOUT,
        }
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    fn privileged(&self, program: &str, args: &[&str]) -> (String, Vec<String>) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        if self.use_sudo {
            let mut sudo_args = vec![program.to_string()];
            sudo_args.extend(args);
            ("sudo".to_string(), sudo_args)
        } else {
            (program.to_string(), args)
        }
    }

    /// Stop a service, escalating to `kill -9` on its main pid when the
    /// graceful stop fails or does not finish within the stop timeout.
    pub async fn stop(&self, service_name: &str) -> Result<(), ServiceError> {
        info!("Stopping service: {}", service_name);

        let (program, args) = self.privileged("systemctl", &["stop", service_name]);
        let graceful_failure = match timeout(self.stop_timeout, self.runner.run(&program, &args)).await {
            Ok(Ok(output)) if output.success => {
                info!("Service {} stopped successfully", service_name);
                return Ok(());
            }
            Ok(Ok(output)) => output.error_message(),
            Ok(Err(e)) => format!("could not run systemctl: {}", e),
            Err(_) => format!("did not stop within {}s", self.stop_timeout.as_secs()),
        };

        warn!(
            "Graceful stop of {} failed ({}), attempting to kill its process",
            service_name, graceful_failure
        );

        let handle = self.main_pid(service_name).await.map_err(|e| ServiceError::StopFailed {
            service: service_name.to_string(),
            reason: format!("{}; {}", graceful_failure, e),
        })?;

        let pid = handle.pid.ok_or_else(|| ServiceError::StopFailed {
            service: service_name.to_string(),
            reason: format!("{}; no running process found", graceful_failure),
        })?;

        let (program, args) = self.privileged("kill", &["-9", pid.as_str()]);
        match self.runner.run(&program, &args).await {
            Ok(output) if output.success => {
                info!("Process {} for service {} killed", pid, service_name);
                Ok(())
            }
            Ok(output) => Err(ServiceError::StopFailed {
                service: service_name.to_string(),
                reason: format!("kill -9 {} failed: {}", pid, output.error_message()),
            }),
            Err(e) => Err(ServiceError::StopFailed {
                service: service_name.to_string(),
                reason: format!("kill -9 {} could not run: {}", pid, e),
            }),
        }
    }

    pub async fn start(&self, service_name: &str) -> Result<(), ServiceError> {
        info!("Starting service: {}", service_name);

        let (program, args) = self.privileged("systemctl", &["start", service_name]);
        let output = self
            .runner
            .run(&program, &args)
            .await
            .map_err(|e| ServiceError::StartFailed {
                service: service_name.to_string(),
                reason: format!("could not run systemctl: {}", e),
            })?;

        if !output.success {
            error!("Failed to start service {}: {}", service_name, output.error_message());
            return Err(ServiceError::StartFailed {
                service: service_name.to_string(),
                reason: output.error_message(),
            });
        }

        info!("Service {} started successfully", service_name);
        Ok(())
    }

    /// Resolve the unit's main pid through `systemctl show`
    pub async fn main_pid(&self, service_name: &str) -> Result<ProcessHandle, ServiceError> {
        debug!("Resolving main pid of {}", service_name);

        let args = vec![
            "show".to_string(),
            service_name.to_string(),
            "--property=MainPID".to_string(),
        ];
        let output = self
            .runner
            .run("systemctl", &args)
            .await
            .map_err(|e| ServiceError::Query {
                service: service_name.to_string(),
                reason: e.to_string(),
            })?;

        if !output.success {
            return Err(ServiceError::Query {
                service: service_name.to_string(),
                reason: output.error_message(),
            });
        }

        Ok(ProcessHandle {
            pid: parse_main_pid(&output.stdout),
        })
    }
}

/// Extract a non-zero pid from `MainPID=<n>` output
pub fn parse_main_pid(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("MainPID="))
        .map(str::trim)
        .find(|pid| matches!(pid.parse::<u32>(), Ok(n) if n != 0))
        .map(str::to_string)
}
