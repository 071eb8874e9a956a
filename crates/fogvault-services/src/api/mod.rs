//! REST API for plugin installs and snapshots.
//!
//! Routes:
//! - `POST /plugins`
//! - `GET|POST /snapshot/plugins`
//! - `PUT|DELETE /snapshot/plugins/{id}`
//! - `GET /health`

pub mod error;
pub mod handlers;
pub mod plugins;
pub mod snapshot;

use std::sync::Arc;

use axum::Router;
use fogvault_types::config::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::installer::PluginInstaller;
use crate::lock::LockRegistry;
use crate::snapshot::SnapshotManager;

pub use error::ApiError;

/// Shared state accessible by all API handlers.
#[derive(Clone)]
pub struct ApiState {
    /// Plugin installer.
    pub installer: Arc<PluginInstaller>,
    /// Snapshot manager.
    pub snapshots: Arc<SnapshotManager>,
}

impl ApiState {
    /// Build both services around one shared lock registry.
    pub fn from_config(config: Arc<Config>) -> crate::Result<Self> {
        let locks = LockRegistry::new();
        Ok(Self {
            installer: Arc::new(PluginInstaller::new(Arc::clone(&config), locks.clone())?),
            snapshots: Arc::new(SnapshotManager::new(config, locks)),
        })
    }
}

/// Build the API router with all routes.
pub fn build_router(state: ApiState, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    handlers::api_routes()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
