use super::executor::{CommandExecutor, RoleCommand};
use super::health::{ReadinessProbe, DEFAULT_PROBE_ATTEMPTS, DEFAULT_PROBE_INTERVAL};
use super::restart::RestartPolicy;
use super::role::{spawn_role, Role, RoleExit, RoleHandle};
use crate::platform::Bundle;
use crate::version::VersionInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Timings and policies shared by every supervisor the daemon creates.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// How long a role gets to exit after the interrupt
    pub stop_grace: Duration,
    /// How long to wait for a role after the kill
    pub kill_wait: Duration,
    /// Pause at the end of boot so both processes can settle
    pub settle_delay: Duration,
    pub probe_interval: Duration,
    pub probe_attempts: u32,
    pub restart: RestartPolicy,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            stop_grace: Duration::from_secs(3),
            kill_wait: Duration::from_secs(5),
            settle_delay: Duration::from_secs(3),
            probe_interval: DEFAULT_PROBE_INTERVAL,
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            restart: RestartPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Booting,
    Running,
    Stopping,
    Stopped,
}

impl SupervisorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Booting => "booting",
            SupervisorState::Running => "running",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Stopped => "stopped",
        }
    }
}

/// Outcome of the boot sequence. Boot never aborts, so every flag is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootReport {
    pub initialized: bool,
    pub prepared: bool,
    pub ready: bool,
}

/// How each role ended; `None` when the role was never launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopReport {
    pub primary: Option<RoleExit>,
    pub monitor: Option<RoleExit>,
}

/// Owns the primary and monitor processes of one bundle version.
///
/// A supervisor is never retargeted: a new version gets a new supervisor.
pub struct Supervisor {
    version: VersionInfo,
    bundle: Bundle,
    config: SupervisorConfig,
    state: SupervisorState,
    stopping: Arc<AtomicBool>,
    primary: Option<RoleHandle>,
    monitor: Option<RoleHandle>,
    executor: CommandExecutor,
}

impl Supervisor {
    pub fn new(version: VersionInfo, bundle: Bundle, config: SupervisorConfig) -> Self {
        Self {
            version,
            bundle,
            config,
            state: SupervisorState::Idle,
            stopping: Arc::new(AtomicBool::new(false)),
            primary: None,
            monitor: None,
            executor: CommandExecutor::new(),
        }
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn pid(&self, role: Role) -> Option<u32> {
        let handle = match role {
            Role::Primary => self.primary.as_ref(),
            Role::Monitor => self.monitor.as_ref(),
        };
        handle.and_then(RoleHandle::pid)
    }

    fn init_command(&self) -> RoleCommand {
        RoleCommand::new(self.bundle.primary()).args(["init"])
    }

    fn prepare_command(&self) -> RoleCommand {
        RoleCommand::new(self.bundle.install_script())
    }

    fn daemon_command(&self) -> RoleCommand {
        RoleCommand::new(self.bundle.primary()).args(["daemon"])
    }

    fn probe_command(&self) -> RoleCommand {
        RoleCommand::new(self.bundle.primary()).args(["stats", "bw"])
    }

    fn monitor_command(&self) -> RoleCommand {
        RoleCommand::new(self.bundle.monitor())
    }

    /// Initializes the bundle, launches both roles and waits for them to settle.
    ///
    /// Failures along the way are logged and reported, never fatal.
    pub async fn boot(&mut self) -> BootReport {
        if self.state != SupervisorState::Idle {
            warn!(state = self.state.as_str(), "Supervisor already booted, ignoring");
            return BootReport::default();
        }

        info!(version = %self.version.version, bundle = %self.bundle.dir().display(), "Booting supervisor");
        self.state = SupervisorState::Booting;

        let initialized = self.run_step("init", &self.init_command()).await;
        let prepared = self.run_step("install dependencies", &self.prepare_command()).await;

        self.primary = Some(spawn_role(
            Role::Primary,
            self.daemon_command(),
            Arc::clone(&self.stopping),
            self.config.restart,
        ));

        let probe = ReadinessProbe::new(self.probe_command())
            .with_interval(self.config.probe_interval)
            .with_attempts(self.config.probe_attempts);
        let ready = match probe.wait_ready().await {
            Ok(_) => true,
            Err(e) => {
                error!(version = %self.version.version, "Primary process may not have started properly: {}", e);
                false
            }
        };

        self.monitor = Some(spawn_role(
            Role::Monitor,
            self.monitor_command(),
            Arc::clone(&self.stopping),
            self.config.restart,
        ));

        tokio::time::sleep(self.config.settle_delay).await;

        self.state = SupervisorState::Running;
        info!(version = %self.version.version, ready, "Supervisor running");

        BootReport {
            initialized,
            prepared,
            ready,
        }
    }

    async fn run_step(&self, name: &str, command: &RoleCommand) -> bool {
        match self.executor.run(command).await {
            Ok(status) if status.success() => true,
            Ok(status) => {
                error!(step = name, code = ?status.code(), "Bundle step exited unsuccessfully");
                false
            }
            Err(e) => {
                error!(step = name, "Bundle step failed: {}", e);
                false
            }
        }
    }

    /// Interrupts both roles, then escalates each to a kill independently
    /// if it outlives the grace period.
    pub async fn stop(&mut self) -> StopReport {
        match self.state {
            SupervisorState::Stopped => return StopReport::default(),
            SupervisorState::Idle => {
                self.state = SupervisorState::Stopped;
                return StopReport::default();
            }
            _ => {}
        }

        info!(version = %self.version.version, "Stopping supervisor");
        self.state = SupervisorState::Stopping;
        self.stopping.store(true, Ordering::SeqCst);

        for handle in [self.primary.as_ref(), self.monitor.as_ref()].into_iter().flatten() {
            handle.interrupt();
        }

        let grace = self.config.stop_grace;
        let kill_wait = self.config.kill_wait;
        let (primary, monitor) = tokio::join!(
            shutdown_role(self.primary.as_mut(), grace, kill_wait),
            shutdown_role(self.monitor.as_mut(), grace, kill_wait),
        );

        self.state = SupervisorState::Stopped;
        info!(version = %self.version.version, ?primary, ?monitor, "Supervisor stopped");

        StopReport { primary, monitor }
    }

    /// Kills both roles without waiting for them.
    pub fn kill(&mut self) {
        if self.state == SupervisorState::Stopped {
            return;
        }

        warn!(version = %self.version.version, "Killing supervisor processes");
        self.stopping.store(true, Ordering::SeqCst);
        for handle in [self.primary.as_ref(), self.monitor.as_ref()].into_iter().flatten() {
            handle.force_kill();
        }
        self.state = SupervisorState::Stopped;
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if matches!(
            self.state,
            SupervisorState::Booting | SupervisorState::Running | SupervisorState::Stopping
        ) {
            self.kill();
        }
    }
}

async fn shutdown_role(
    handle: Option<&mut RoleHandle>,
    grace: Duration,
    kill_wait: Duration,
) -> Option<RoleExit> {
    match handle {
        Some(handle) => Some(handle.shutdown(grace, kill_wait).await),
        None => None,
    }
}
