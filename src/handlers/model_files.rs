//! Hydrus / Modflow / weather file HTTP handlers.
//!
//! This module implements the endpoints that move simulation input files in
//! and out of a project:
//! - PUT /api/v1/projects/:id/hydrus/:hydrus_id - Upload Hydrus model (ZIP body)
//! - DELETE /api/v1/projects/:id/hydrus/:hydrus_id - Remove Hydrus model
//! - PUT /api/v1/projects/:id/modflow/:modflow_id - Upload Modflow model (ZIP body)
//! - DELETE /api/v1/projects/:id/modflow - Remove the Modflow model
//! - PUT /api/v1/projects/:id/weather/:weather_id - Upload weather file (raw body)
//! - DELETE /api/v1/projects/:id/weather/:weather_id - Remove weather file
//! - PUT /api/v1/projects/:id/hydrus/:hydrus_id/weather/:weather_id - Assign weather
//! - DELETE /api/v1/projects/:id/hydrus/:hydrus_id/weather - Unassign weather
//!
//! Model uploads are raw ZIP request bodies, not multipart forms: the
//! archive is the whole payload and the identifiers travel in the path.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};

use crate::{
    error::AppError, models::project::ProjectMetadata, services::project_service,
    state::AppState,
};

/// Upload a Hydrus model archive into a project.
///
/// # Request Body
///
/// The ZIP archive itself (`Content-Type: application/zip`). It is extracted
/// into `hydrus/<hydrus_id>/` inside the project; uploading to an existing
/// id overwrites matching files.
///
/// # Response
///
/// - **Success (200 OK)**: Updated project metadata
/// - **Error (400)**: Body is not a readable ZIP, or an entry escapes the
///   extraction root
/// - **Error (404)**: No project with this id
pub async fn upload_hydrus_model(
    State(state): State<AppState>,
    Path((project_id, hydrus_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata =
        project_service::add_hydrus_model(state.dao.as_ref(), &project_id, &hydrus_id, body.to_vec())
            .await?;
    Ok(Json(metadata))
}

/// Remove a Hydrus model and every mapping that references it.
pub async fn delete_hydrus_model(
    State(state): State<AppState>,
    Path((project_id, hydrus_id)): Path<(String, String)>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata =
        project_service::delete_hydrus_model(state.dao.as_ref(), &project_id, &hydrus_id).await?;
    Ok(Json(metadata))
}

/// Upload the Modflow model archive, replacing any previous model.
///
/// A project has at most one Modflow model; uploading a second one deletes
/// the first, mirroring the desktop application's behavior.
pub async fn upload_modflow_model(
    State(state): State<AppState>,
    Path((project_id, modflow_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata = project_service::set_modflow_model(
        state.dao.as_ref(),
        &project_id,
        &modflow_id,
        body.to_vec(),
    )
    .await?;
    Ok(Json(metadata))
}

/// Remove the project's Modflow model.
///
/// # Response
///
/// - **Success (200 OK)**: Updated project metadata
/// - **Error (404)**: The project has no Modflow model
pub async fn delete_modflow_model(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata = project_service::delete_modflow_model(state.dao.as_ref(), &project_id).await?;
    Ok(Json(metadata))
}

/// Upload a weather file. The body is stored as-is under
/// `weather/<weather_id>` (weather data is opaque to the store).
pub async fn upload_weather_file(
    State(state): State<AppState>,
    Path((project_id, weather_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata = project_service::add_weather_file(
        state.dao.as_ref(),
        &project_id,
        &weather_id,
        body.to_vec(),
    )
    .await?;
    Ok(Json(metadata))
}

/// Remove a weather file and the Hydrus assignments that use it.
pub async fn delete_weather_file(
    State(state): State<AppState>,
    Path((project_id, weather_id)): Path<(String, String)>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata =
        project_service::delete_weather_file(state.dao.as_ref(), &project_id, &weather_id).await?;
    Ok(Json(metadata))
}

/// Assign a weather file to a Hydrus model.
///
/// # Response
///
/// - **Success (200 OK)**: Updated project metadata
/// - **Error (404)**: Unknown Hydrus model or weather file
pub async fn assign_weather_file(
    State(state): State<AppState>,
    Path((project_id, hydrus_id, weather_id)): Path<(String, String, String)>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata = project_service::map_hydrus_to_weather_file(
        state.dao.as_ref(),
        &project_id,
        &hydrus_id,
        &weather_id,
    )
    .await?;
    Ok(Json(metadata))
}

/// Drop the weather assignment of a Hydrus model.
pub async fn unassign_weather_file(
    State(state): State<AppState>,
    Path((project_id, hydrus_id)): Path<(String, String)>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata = project_service::remove_weather_hydrus_mapping(
        state.dao.as_ref(),
        &project_id,
        &hydrus_id,
    )
    .await?;
    Ok(Json(metadata))
}
