use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispatch_worker::client::DispatchClient;
use dispatch_worker::config::WorkerConfig;
use dispatch_worker::handler::CommandHandler;
use dispatch_worker::runner::WorkerLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dispatch_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    tracing::info!(dispatch_url = %config.dispatch_url, "Loaded worker configuration");

    let worker = WorkerLoop::new(
        Arc::new(DispatchClient::new(config.dispatch_url.clone())),
        Arc::new(CommandHandler::new(config.command_timeout())),
    )
    .with_name(config.worker_name.clone())
    .with_poll_interval(config.poll_interval());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received SIGINT (Ctrl-C), stopping worker");
            cancel.cancel();
        }
    });

    let stats = worker
        .run(cancel)
        .await
        .context("Worker could not register with the dispatcher")?;
    tracing::info!(
        completed = stats.completed,
        failed = stats.failed,
        "Worker stopped",
    );
    Ok(())
}
