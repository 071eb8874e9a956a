//! Snapshot endpoints.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use super::{ApiError, ApiState};
use fogvault_types::snapshot::SnapshotEntry;

/// Body of `GET /snapshot/plugins`.
#[derive(Debug, Serialize)]
pub struct SnapshotList {
    pub snapshots: Vec<SnapshotEntry>,
}

/// Body of the mutating snapshot endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /snapshot/plugins`
pub async fn list_snapshots(State(state): State<ApiState>) -> Result<Json<SnapshotList>, ApiError> {
    let snapshots = state.snapshots.list().await?;
    Ok(Json(SnapshotList { snapshots }))
}

/// `POST /snapshot/plugins`
pub async fn create_snapshot(
    State(state): State<ApiState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let created = state.snapshots.create().await?;
    Ok(Json(MessageResponse {
        message: format!(
            "snapshot id={}, file={} created successfully.",
            created.id, created.name
        ),
    }))
}

/// `PUT /snapshot/plugins/{id}`
pub async fn restore_snapshot(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let restored = state.snapshots.restore(&id).await?;
    Ok(Json(MessageResponse {
        message: format!("snapshot {} restored successfully.", restored.name),
    }))
}

/// `DELETE /snapshot/plugins/{id}`
pub async fn delete_snapshot(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state.snapshots.delete(&id).await?;
    Ok(Json(MessageResponse {
        message: format!("snapshot {} deleted successfully.", deleted.name),
    }))
}
