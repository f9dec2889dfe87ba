//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Lookup Errors**: Requested project, model, shape or weather file does
///   not exist
/// - **Authentication Errors**: Invalid or missing API keys
/// - **Validation Errors**: Invalid request data (bad archives, bad masks)
/// - **Storage Errors**: Filesystem or object store failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No project with the given id exists in the store.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// A project with the given id already exists.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Project already exists: {0}")]
    DuplicateProject(String),

    /// The project metadata does not reference a Hydrus model with this id.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Unknown Hydrus model: {0}")]
    UnknownHydrusModel(String),

    /// The project has no Modflow model assigned.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Project has no Modflow model")]
    UnknownModflowModel,

    /// The project metadata does not reference a shape with this id.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Unknown shape: {0}")]
    UnknownShape(String),

    /// The project metadata does not reference a weather file with this id.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Unknown weather file: {0}")]
    UnknownWeatherFile(String),

    /// API key is missing or does not match the configured key.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An uploaded model archive could not be read as a ZIP file.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Bad model archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Filesystem operation failed (workspace backend).
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Project metadata or a shape mask could not be (de)serialized.
    #[error("Metadata serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A request to the object store could not be performed.
    #[error("Object store request failed: {0}")]
    ObjectStore(#[from] reqwest::Error),

    /// The object store answered with an unexpected HTTP status.
    #[error("Object store returned status {status} for {key}")]
    ObjectStoreStatus { status: u16, key: String },

    /// A blocking archive task panicked or was cancelled.
    #[error("Archive task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Storage-level errors (I/O, object store, serialization) are logged and
/// reported to the client as a generic 500 without internal details.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::ProjectNotFound(_) => {
                (StatusCode::NOT_FOUND, "project_not_found", self.to_string())
            }
            AppError::DuplicateProject(_) => (
                StatusCode::CONFLICT,
                "project_already_exists",
                self.to_string(),
            ),
            AppError::UnknownHydrusModel(_) => (
                StatusCode::NOT_FOUND,
                "unknown_hydrus_model",
                self.to_string(),
            ),
            AppError::UnknownModflowModel => (
                StatusCode::NOT_FOUND,
                "unknown_modflow_model",
                self.to_string(),
            ),
            AppError::UnknownShape(_) => (StatusCode::NOT_FOUND, "unknown_shape", self.to_string()),
            AppError::UnknownWeatherFile(_) => (
                StatusCode::NOT_FOUND,
                "unknown_weather_file",
                self.to_string(),
            ),
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Archive(_) => (StatusCode::BAD_REQUEST, "bad_archive", self.to_string()),
            AppError::Io(_)
            | AppError::Json(_)
            | AppError::ObjectStore(_)
            | AppError::ObjectStoreStatus { .. }
            | AppError::TaskJoin(_) => {
                tracing::error!("storage error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}
