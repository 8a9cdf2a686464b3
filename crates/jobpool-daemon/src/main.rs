//! `jobpoold` entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use jobpool_core::Pool;
use jobpool_daemon::auth::ApiKey;
use jobpool_daemon::config::DaemonConfig;
use jobpool_daemon::http::{router, AppState};
use jobpool_daemon::metrics::DaemonMetrics;
use jobpool_daemon::sweeper;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Lease pool daemon for ephemeral job handles.
#[derive(Debug, Parser)]
#[command(name = "jobpoold", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Bind address, overriding the config file and environment.
    #[arg(long)]
    bind: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("applying environment overrides")?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    config.validate().context("validating config")?;

    let pool = Arc::new(Pool::new(config.pool.clone()));
    let metrics = Arc::new(DaemonMetrics::new().context("registering metrics")?);
    let state = AppState {
        pool: Arc::clone(&pool),
        metrics,
        api_key: ApiKey::new(config.api_key.clone()),
    };

    let sweep_task = sweeper::spawn(Arc::clone(&pool));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(addr = %config.bind, "jobpoold listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweep_task.abort();
    info!("jobpoold stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
