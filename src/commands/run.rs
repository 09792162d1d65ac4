use warden::daemon::{Orchestrator, OrchestratorHandle, StopMode};
use warden::WardenConfig;

pub(crate) async fn cmd_run(config: &WardenConfig) -> anyhow::Result<()> {
    let installer = super::build_installer(config)?;
    let orchestrator = Orchestrator::new(
        installer,
        config.supervisor_config(),
        config.check_schedule(),
    );

    tracing::info!(product = %config.product, "Warden starting");
    let handle = orchestrator.spawn();

    let mode = wait_for_stop(&handle).await?;
    tracing::info!(?mode, "Stop requested");

    if !handle.shutdown(mode).await {
        tracing::warn!("Orchestrator exited without acknowledging stop");
    }
    tracing::info!("Warden stopped");
    Ok(())
}

/// SIGINT and SIGTERM stop gracefully, SIGQUIT kills, SIGHUP forces a check.
#[cfg(unix)]
async fn wait_for_stop(handle: &OrchestratorHandle) -> anyhow::Result<StopMode> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut hangup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = interrupt.recv() => return Ok(StopMode::Graceful),
            _ = terminate.recv() => return Ok(StopMode::Graceful),
            _ = quit.recv() => return Ok(StopMode::Fast),
            _ = hangup.recv() => {
                tracing::info!("SIGHUP received, checking for updates");
                handle.recheck();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_stop(_handle: &OrchestratorHandle) -> anyhow::Result<StopMode> {
    tokio::signal::ctrl_c().await?;
    Ok(StopMode::Graceful)
}
