use super::executor::{CommandExecutor, RoleCommand};
use crate::error::{Result, WardenError};
use std::time::Duration;
use tracing::{debug, info};

/// Default interval between readiness attempts
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of readiness attempts
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 30;

/// Polls the primary's control plane with a lightweight status command
/// until it answers successfully.
pub struct ReadinessProbe {
    command: RoleCommand,
    interval: Duration,
    attempts: u32,
    executor: CommandExecutor,
}

impl ReadinessProbe {
    pub fn new(command: RoleCommand) -> Self {
        Self {
            command,
            interval: DEFAULT_PROBE_INTERVAL,
            attempts: DEFAULT_PROBE_ATTEMPTS,
            executor: CommandExecutor::new(),
        }
    }

    /// Set the interval between attempts
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the maximum number of attempts
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Returns the attempt number that succeeded.
    pub async fn wait_ready(&self) -> Result<u32> {
        for attempt in 1..=self.attempts {
            match self.executor.output(&self.command).await {
                Ok(output) if output.status.success() => {
                    info!(attempt, "Primary process is ready");
                    return Ok(attempt);
                }
                Ok(output) => {
                    debug!(attempt, code = ?output.status.code(), "Readiness probe not yet successful");
                }
                Err(e) => {
                    debug!(attempt, "Readiness probe failed to run: {}", e);
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(WardenError::ReadinessTimeout {
            attempts: self.attempts,
        })
    }
}
