//! Route table and health check.

use axum::{
    Json, Router,
    routing::{get, post, put},
};

use super::ApiState;

/// Build all API routes.
pub fn api_routes() -> Router<ApiState> {
    Router::new()
        // Plugin install
        .route("/plugins", post(super::plugins::install_plugin))
        // Snapshots
        .route(
            "/snapshot/plugins",
            get(super::snapshot::list_snapshots).post(super::snapshot::create_snapshot),
        )
        .route(
            "/snapshot/plugins/{id}",
            put(super::snapshot::restore_snapshot).delete(super::snapshot::delete_snapshot),
        )
        // Health check
        .route("/health", get(health_check))
}

/// Returns basic health status and version.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
