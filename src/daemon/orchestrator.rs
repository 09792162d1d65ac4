//! The daemon's single control loop.
//!
//! ```text
//!            ┌──────── stop request ────────▶ stop supervisor ─▶ ack ─▶ exit
//!  select! ──┤
//!            └──────── timer / recheck ─────▶ Installer::check_and_install
//!                                                  │ version changed?
//!                                                  ▼
//!                                   old.stop()  ─▶  new.boot()
//! ```
//!
//! The loop owns the current version and the active [`Supervisor`]; nothing
//! else can touch either. Checks never overlap, and an old supervisor is fully
//! stopped before its replacement spawns anything.

use super::supervisor::{Supervisor, SupervisorConfig};
use crate::installer::Installer;
use crate::version::VersionInfo;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// When update checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSchedule {
    /// Delay before the first check after start
    pub initial_delay: Duration,
    /// Steady-state polling period
    pub interval: Duration,
}

impl Default for CheckSchedule {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            interval: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Interrupt, wait, then kill stragglers
    Graceful,
    /// Kill immediately
    Fast,
}

pub struct Orchestrator {
    installer: Installer,
    supervisor_config: SupervisorConfig,
    schedule: CheckSchedule,
    current: VersionInfo,
    supervisor: Option<Supervisor>,
}

impl Orchestrator {
    pub fn new(
        installer: Installer,
        supervisor_config: SupervisorConfig,
        schedule: CheckSchedule,
    ) -> Self {
        Self {
            installer,
            supervisor_config,
            schedule,
            current: VersionInfo::default(),
            supervisor: None,
        }
    }

    pub fn current(&self) -> &VersionInfo {
        &self.current
    }

    pub fn supervisor(&self) -> Option<&Supervisor> {
        self.supervisor.as_ref()
    }

    /// Runs the loop on a new task.
    pub fn spawn(self) -> OrchestratorHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let recheck = Arc::new(Notify::new());

        let task = tokio::spawn(self.run(stop_rx, Arc::clone(&recheck), done_tx));

        OrchestratorHandle {
            stop_tx,
            done_rx,
            recheck,
            task,
        }
    }

    /// Loops until a stop request arrives, then stops the active supervisor
    /// and acknowledges on `done`. A dropped stop sender counts as a graceful
    /// stop request.
    pub async fn run(
        mut self,
        mut stop: oneshot::Receiver<StopMode>,
        recheck: Arc<Notify>,
        done: oneshot::Sender<()>,
    ) {
        info!(
            initial_delay = ?self.schedule.initial_delay,
            interval = ?self.schedule.interval,
            "Orchestrator started"
        );
        let mut delay = self.schedule.initial_delay;

        loop {
            tokio::select! {
                biased;
                mode = &mut stop => {
                    let mode = mode.unwrap_or(StopMode::Graceful);
                    self.stop_active(mode).await;
                    let _ = done.send(());
                    info!("Orchestrator stopped");
                    return;
                }
                _ = tokio::time::sleep(delay) => {
                    delay = self.schedule.interval;
                    self.check().await;
                }
                _ = recheck.notified() => {
                    delay = self.schedule.interval;
                    self.check().await;
                }
            }
        }
    }

    /// Runs one update cycle and swaps supervisors if the version changed.
    /// Returns whether a new supervisor was booted.
    pub async fn check(&mut self) -> bool {
        let next = self.installer.check_and_install(&self.current).await;

        if next.is_empty() || next.version == self.current.version {
            return false;
        }

        if let Some(mut old) = self.supervisor.take() {
            info!(
                from = %old.version().version,
                to = %next.version,
                "Replacing supervisor"
            );
            old.stop().await;
        }

        let bundle = self.installer.layout().bundle(&next.version);
        let mut supervisor = Supervisor::new(next.clone(), bundle, self.supervisor_config.clone());
        supervisor.boot().await;

        self.supervisor = Some(supervisor);
        self.current = next;
        true
    }

    async fn stop_active(&mut self, mode: StopMode) {
        let Some(mut supervisor) = self.supervisor.take() else {
            return;
        };

        info!(version = %supervisor.version().version, ?mode, "Stopping active supervisor");
        match mode {
            StopMode::Graceful => {
                supervisor.stop().await;
            }
            StopMode::Fast => supervisor.kill(),
        }
    }
}

/// Control side of a spawned [`Orchestrator`].
pub struct OrchestratorHandle {
    stop_tx: oneshot::Sender<StopMode>,
    done_rx: oneshot::Receiver<()>,
    recheck: Arc<Notify>,
    task: JoinHandle<()>,
}

impl OrchestratorHandle {
    /// Runs an update check now instead of waiting for the timer.
    pub fn recheck(&self) {
        self.recheck.notify_one();
    }

    /// Requests a stop and waits for the acknowledgement. Returns whether the
    /// loop acknowledged.
    pub async fn shutdown(self, mode: StopMode) -> bool {
        let _ = self.stop_tx.send(mode);
        let acked = self.done_rx.await.is_ok();

        if let Err(e) = self.task.await {
            error!("Orchestrator task failed: {}", e);
        }
        acked
    }
}
