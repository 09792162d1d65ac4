pub mod clienv;
pub mod config;
pub mod daemon;
pub mod error;
pub mod installer;
pub mod platform;
pub mod version;

#[cfg(test)]
mod testing;

pub use config::WardenConfig;
pub use error::{Result, WardenError};
pub use installer::Installer;
pub use version::{VersionInfo, VersionStore};
