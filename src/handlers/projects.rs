//! Project lifecycle HTTP handlers.
//!
//! This module implements the project-level API endpoints:
//! - POST /api/v1/projects - Create new project
//! - GET /api/v1/projects - List project names
//! - GET /api/v1/projects/:id - Get project metadata
//! - PUT /api/v1/projects/:id - Replace project metadata
//! - DELETE /api/v1/projects/:id - Delete project
//! - GET /api/v1/projects/:id/download - Download project as ZIP

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    error::AppError, models::project::ProjectMetadata, services::project_service,
    state::AppState,
};

/// Create a new project.
///
/// # Endpoint
///
/// `POST /api/v1/projects`
///
/// # Request Body
///
/// A metadata document; only `project_id` is required, everything else
/// defaults to an empty project.
///
/// ```json
/// {
///   "project_id": "warta-basin",
///   "lat": 52.4,
///   "long": 16.9
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: Returns the stored metadata
/// - **Error (409)**: A project with this id already exists
/// - **Error (400)**: The project id is not a valid directory name
pub async fn create_project(
    State(state): State<AppState>,
    Json(metadata): Json<ProjectMetadata>,
) -> Result<impl IntoResponse, AppError> {
    let metadata = project_service::create(state.dao.as_ref(), metadata).await?;
    Ok((StatusCode::CREATED, Json(metadata)))
}

/// List the names of all stored projects, sorted.
///
/// # Endpoint
///
/// `GET /api/v1/projects`
///
/// # Response (200 OK)
///
/// ```json
/// ["warta-basin", "vistula-delta"]
/// ```
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    let names = project_service::get_all_project_names(state.dao.as_ref()).await?;
    Ok(Json(names))
}

/// Get a project's metadata document.
///
/// # Response
///
/// - **Success (200 OK)**: The metadata document
/// - **Error (404)**: No project with this id
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata = project_service::get(state.dao.as_ref(), &project_id).await?;
    Ok(Json(metadata))
}

/// Replace a project's metadata document.
///
/// The id in the URL wins over the one in the body, so a renamed body cannot
/// move the document to another project.
///
/// # Response
///
/// - **Success (200 OK)**: The stored metadata
/// - **Error (404)**: No project with this id
pub async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(metadata): Json<ProjectMetadata>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata =
        project_service::save_or_update_metadata(state.dao.as_ref(), &project_id, metadata).await?;
    Ok(Json(metadata))
}

/// Delete a project and everything stored under it.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (404)**: No project with this id
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<StatusCode, AppError> {
    project_service::delete(state.dao.as_ref(), &project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Download a whole project as a ZIP archive.
///
/// # Endpoint
///
/// `GET /api/v1/projects/:id/download`
///
/// # Response
///
/// - **Success (200 OK)**: `application/zip` body with
///   `Content-Disposition: attachment; filename="<id>.zip"`
/// - **Error (404)**: No project with this id
pub async fn download_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let archive = project_service::download_project(state.dao.as_ref(), &project_id).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{project_id}.zip\""),
        ),
    ];
    Ok((headers, archive))
}
