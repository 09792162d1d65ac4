//! Supervised restart loop for one process role.
//!
//! Each role runs in its own task which is the only owner of the live
//! [`tokio::process::Child`]. Other tasks talk to it through a
//! [`RoleHandle`]: an interrupt is delivered as an OS signal to the recorded
//! PID, a forced kill is a notification the loop answers by killing its own
//! child, and completion comes back over a oneshot channel.

use super::executor::RoleCommand;
use super::restart::RestartPolicy;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Primary,
    Monitor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Monitor => "monitor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a role's restart loop came to an end during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleExit {
    /// Exited within the grace period
    Stopped,
    /// Needed an unconditional kill
    Killed,
    /// Still running after the kill wait elapsed
    Unresponsive,
}

struct RoleControl {
    /// PID of the live child, 0 when none
    pid: AtomicU32,
    kill: Notify,
}

pub struct RoleHandle {
    role: Role,
    control: Arc<RoleControl>,
    done: Option<oneshot::Receiver<()>>,
}

/// Starts the restart loop for `role` on the current runtime.
///
/// The loop keeps relaunching `command` until `stopping` is set or the
/// policy runs out of attempts.
pub fn spawn_role(
    role: Role,
    command: RoleCommand,
    stopping: Arc<AtomicBool>,
    policy: RestartPolicy,
) -> RoleHandle {
    let control = Arc::new(RoleControl {
        pid: AtomicU32::new(0),
        kill: Notify::new(),
    });
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(restart_loop(
        role,
        command,
        Arc::clone(&control),
        stopping,
        policy,
        done_tx,
    ));

    RoleHandle {
        role,
        control,
        done: Some(done_rx),
    }
}

async fn restart_loop(
    role: Role,
    command: RoleCommand,
    control: Arc<RoleControl>,
    stopping: Arc<AtomicBool>,
    policy: RestartPolicy,
    done: oneshot::Sender<()>,
) {
    let mut attempt: u32 = 0;

    while !stopping.load(Ordering::SeqCst) {
        if !policy.allows(attempt) {
            warn!(role = %role, attempts = attempt, "Restart limit reached, giving up");
            break;
        }

        if attempt > 0 {
            let delay = policy.delay(attempt - 1);
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = control.kill.notified() => {}
                }
            }
            if stopping.load(Ordering::SeqCst) {
                break;
            }
        }
        attempt += 1;

        let mut child = match command.command().spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(role = %role, "Error when starting {}: {}", command, e);
                continue;
            }
        };

        let pid = child.id();
        control.pid.store(pid.unwrap_or(0), Ordering::SeqCst);
        info!(role = %role, pid = ?pid, attempt, "Process started");

        tokio::select! {
            status = child.wait() => match status {
                Ok(status) => info!(role = %role, pid = ?pid, code = ?status.code(), "Process exited"),
                Err(e) => error!(role = %role, "Failed to wait on process: {}", e),
            },
            _ = control.kill.notified() => {
                warn!(role = %role, pid = ?pid, "Force killing process");
                if let Err(e) = child.kill().await {
                    error!(role = %role, "Failed to kill process: {}", e);
                }
            }
        }

        control.pid.store(0, Ordering::SeqCst);
    }

    debug!(role = %role, "Restart loop finished");
    let _ = done.send(());
}

impl RoleHandle {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn pid(&self) -> Option<u32> {
        match self.control.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Asks the live process to exit (SIGINT). Platforms without signals fall
    /// back to a forced kill.
    pub fn interrupt(&self) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid() {
                debug!(role = %self.role, pid, "Sending interrupt");
                if let Err(e) = send_signal(pid, libc::SIGINT) {
                    debug!(role = %self.role, pid, "Interrupt not delivered: {}", e);
                }
            }
        }

        #[cfg(not(unix))]
        self.force_kill();
    }

    /// Makes the owning loop kill its child right away. Does not wait.
    pub fn force_kill(&self) {
        self.control.kill.notify_one();
    }

    /// Waits up to `grace` for the loop to finish, then kills and waits up
    /// to `kill_wait` more.
    ///
    /// The caller is expected to have raised the stopping flag and sent the
    /// interrupt already.
    pub async fn shutdown(&mut self, grace: Duration, kill_wait: Duration) -> RoleExit {
        let Some(mut done) = self.done.take() else {
            return RoleExit::Stopped;
        };

        if tokio::time::timeout(grace, &mut done).await.is_ok() {
            debug!(role = %self.role, "Stopped gracefully");
            return RoleExit::Stopped;
        }

        warn!(
            role = %self.role,
            "Process did not stop within {:?}, killing",
            grace
        );
        self.force_kill();

        match tokio::time::timeout(kill_wait, done).await {
            Ok(_) => RoleExit::Killed,
            Err(_) => {
                error!(
                    role = %self.role,
                    pid = ?self.pid(),
                    "Process still running {:?} after kill",
                    kill_wait
                );
                RoleExit::Unresponsive
            }
        }
    }
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::journal_lines;
    use serial_test::serial;
    use std::time::Instant;

    async fn wait_for_pid(handle: &RoleHandle) -> u32 {
        for _ in 0..200 {
            if let Some(pid) = handle.pid() {
                return pid;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("role never started");
    }

    fn sh(script: &str) -> RoleCommand {
        RoleCommand::new("sh").args(["-c", script])
    }

    #[tokio::test]
    #[serial]
    async fn test_restart_loop_respects_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("journal");
        let policy = RestartPolicy {
            max_attempts: Some(3),
            ..RestartPolicy::default()
        };

        let mut handle = spawn_role(
            Role::Monitor,
            sh(&format!("echo launched >> {}", journal.display())),
            Arc::new(AtomicBool::new(false)),
            policy,
        );

        let exit = handle
            .shutdown(Duration::from_secs(5), Duration::from_secs(1))
            .await;

        assert_eq!(exit, RoleExit::Stopped);
        assert_eq!(journal_lines(&journal).len(), 3);
    }

    #[tokio::test]
    #[serial]
    async fn test_interrupt_stops_cooperative_process() {
        let stopping = Arc::new(AtomicBool::new(false));
        let mut handle = spawn_role(
            Role::Primary,
            sh("exec sleep 30"),
            Arc::clone(&stopping),
            RestartPolicy::default(),
        );
        wait_for_pid(&handle).await;

        stopping.store(true, Ordering::SeqCst);
        handle.interrupt();
        let exit = handle
            .shutdown(Duration::from_secs(5), Duration::from_secs(5))
            .await;

        assert_eq!(exit, RoleExit::Stopped);
        assert!(handle.pid().is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_ignored_interrupt_escalates_to_kill_within_grace() {
        let stopping = Arc::new(AtomicBool::new(false));
        let mut handle = spawn_role(
            Role::Primary,
            sh("trap '' INT; exec sleep 30"),
            Arc::clone(&stopping),
            RestartPolicy::default(),
        );
        wait_for_pid(&handle).await;

        let grace = Duration::from_millis(300);
        let started = Instant::now();
        stopping.store(true, Ordering::SeqCst);
        handle.interrupt();
        let exit = handle.shutdown(grace, Duration::from_secs(5)).await;

        assert_eq!(exit, RoleExit::Killed);
        assert!(started.elapsed() >= grace);
        assert!(started.elapsed() < grace + Duration::from_secs(2));
    }

    #[tokio::test]
    #[serial]
    async fn test_crashed_process_is_respawned() {
        let dir = tempfile::tempdir().unwrap();
        let journal = dir.path().join("journal");
        let stopping = Arc::new(AtomicBool::new(false));
        let mut handle = spawn_role(
            Role::Monitor,
            sh(&format!("echo launched >> {}; exit 1", journal.display())),
            Arc::clone(&stopping),
            RestartPolicy {
                first: Duration::from_millis(20),
                ..RestartPolicy::default()
            },
        );

        let deadline = Instant::now() + Duration::from_secs(5);
        while journal_lines(&journal).len() < 3 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        stopping.store(true, Ordering::SeqCst);
        handle.force_kill();
        handle
            .shutdown(Duration::from_secs(2), Duration::from_secs(2))
            .await;

        assert!(journal_lines(&journal).len() >= 3);
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::Primary.to_string(), "primary");
        assert_eq!(Role::Monitor.as_str(), "monitor");
    }
}
