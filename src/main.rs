//! quantstage pipeline stage entrypoint.

use mimalloc::MiMalloc;
use tokio::signal;

use quantstage::config::Config;
use quantstage::lifecycle::{CheckpointConfig, CheckpointManager};
use quantstage::service::EncoderService;
use quantstage::transport::{PullSocket, PushSocket};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!(
        mode = %config.mode,
        dump_path = %config.dump_path.display(),
        pull_addr = %config.pull_addr,
        push_addr = %config.push_addr,
        "quantstage starting"
    );

    let mut service = match EncoderService::start(config.service_config()) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(kind = ?e.kind(), error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    let checkpoints = CheckpointManager::new(CheckpointConfig::from_env()?, service.subscribe());
    let watcher = checkpoints.start_watcher();

    let mut pull = PullSocket::bind(&config.pull_addr).await?;
    let push = PushSocket::new(config.push_addr.clone());

    tokio::select! {
        result = service.run(&mut pull, &push) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Message loop stopped");
            }
        }
        _ = shutdown_signal() => {}
    }

    match checkpoints.shutdown().await {
        Ok(outcome) => tracing::info!(?outcome, "Final checkpoint"),
        Err(e) => tracing::error!(error = %e, "Final checkpoint failed"),
    }
    service.shutdown();
    watcher.abort();

    tracing::info!("quantstage shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
