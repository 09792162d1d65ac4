//! Warden daemon - process supervision for the installed bundle
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │               Orchestrator                 │
//! │  (timer / recheck / stop, owns version)    │
//! ├────────────────────────────────────────────┤
//! │  Installer           │  Supervisor (1 per  │
//! │  (manifest, archive, │  version)           │
//! │   bundle)            │                     │
//! ├──────────────────────┴─────────────────────┤
//! │      primary loop      │   monitor loop    │
//! │   (ipfs daemon)        │  (ipfs-monitor)   │
//! └────────────────────────────────────────────┘
//! ```

pub mod executor;
pub mod health;
pub mod orchestrator;
pub mod restart;
pub mod role;
pub mod supervisor;

pub use executor::{CommandExecutor, RoleCommand};
pub use health::ReadinessProbe;
pub use orchestrator::{CheckSchedule, Orchestrator, OrchestratorHandle, StopMode};
pub use restart::RestartPolicy;
pub use role::{Role, RoleExit, RoleHandle};
pub use supervisor::{BootReport, StopReport, Supervisor, SupervisorConfig, SupervisorState};
