//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::AppError, state::AppState};

/// Health check response.
///
/// Returns service status and storage connectivity.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Storage backend status
    pub storage: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Checks
///
/// - Storage reachability (workspace directory readable / bucket listable)
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "storage": "reachable",
///   "timestamp": "2026-08-30T19:00:00Z"
/// }
/// ```
///
/// # Response (500 Internal Server Error)
///
/// If the storage backend is unreachable, returns standard error response.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    // Verify storage connectivity
    state.dao.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        storage: "reachable".to_string(),
        timestamp: Utc::now(),
    }))
}
