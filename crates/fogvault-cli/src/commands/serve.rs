//! `fogvault serve` -- run the REST API.
//!
//! Binds the configured address (or `--bind`), serves plugin install and
//! snapshot routes, and shuts down gracefully on Ctrl+C. In-flight
//! requests are allowed to finish.
//!
//! # Example
//!
//! ```text
//! fogvault serve
//! fogvault serve --bind 127.0.0.1:8081
//! ```

use std::sync::Arc;

use clap::Args;
use fogvault_services::api::{ApiState, build_router};
use fogvault_types::config::Config;
use tracing::info;

/// Arguments for the `fogvault serve` subcommand.
#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (overrides `server.bind`).
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Run the server until Ctrl+C.
pub async fn run(config: Config, args: ServeArgs) -> anyhow::Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let cors_origins = config.server.cors_origins.clone();
    let config = Arc::new(config);

    info!(
        root = %config.root_path().display(),
        snapshots = %config.snapshot_dir().display(),
        "starting fogvault api"
    );

    let state = ApiState::from_config(config)?;
    let router = build_router(state, &cors_origins);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {bind}: {e}"))?;
    info!(addr = %listener.local_addr()?, "api listening -- press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("received shutdown signal");
        })
        .await?;

    info!("api stopped");
    Ok(())
}
