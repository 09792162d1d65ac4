use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "warden")]
#[command(version)]
#[command(about = "Keeps a versioned ipfs bundle installed and running", long_about = None)]
pub(crate) struct Cli {
    /// Config file (default: <config dir>/warden/warden.toml). Can also be set via WARDEN_CONFIG.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding archives, bundles and the version file
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Supervise the bundle and poll for updates until signalled (default)
    Run,

    /// Run a single update check and install, then exit
    Check,

    /// Show the installed version and whether its bundle is complete
    Status,
}
