mod args;
mod commands;

use anyhow::Context;
use args::{Cli, Commands};
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use warden::WardenConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = WardenConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.work_dir {
        config.work_dir = dir;
    }
    if let Some(log_file) = cli.log_file {
        config.log_file = Some(log_file);
    }

    init_tracing(&config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::cmd_run(&config).await?,
        Commands::Check => commands::check::cmd_check(&config).await?,
        Commands::Status => commands::status::cmd_status(&config).await?,
    }

    Ok(())
}

/// RUST_LOG filter, `info` by default. With a log file set, output is appended
/// there without colors.
fn init_tracing(config: &WardenConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
