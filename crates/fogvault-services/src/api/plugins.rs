//! Plugin install endpoint.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;

use super::{ApiError, ApiState};
use crate::error::ServiceError;
use crate::installer::RawInstallRequest;

/// `POST /plugins`
///
/// The body is parsed by hand so malformed JSON is reported in the same
/// `{"error": ...}` shape as every other failure.
pub async fn install_plugin(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let raw: RawInstallRequest = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::InvalidRequest(format!("invalid request body: {e}")))?;
    let request = raw.validate()?;

    let outcome = state.installer.install(&request).await?;
    let mut response = serde_json::json!({ "message": outcome.message() });
    if !outcome.warnings.is_empty() {
        response["warnings"] = serde_json::json!(outcome.warnings);
    }
    Ok(Json(response))
}
