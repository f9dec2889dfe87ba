//! Shape mask and mapping HTTP handlers.
//!
//! This module implements the shape-related API endpoints:
//! - GET /api/v1/projects/:id/shapes - All shapes with masks and colors
//! - DELETE /api/v1/projects/:id/shapes - Wipe all shapes
//! - PUT /api/v1/projects/:id/shapes/:shape_id - Upsert a shape
//! - DELETE /api/v1/projects/:id/shapes/:shape_id - Delete a shape
//! - PUT /api/v1/projects/:id/shapes/:shape_id/mapping - Map to Hydrus/value
//! - DELETE /api/v1/projects/:id/shapes/:shape_id/mapping - Drop the mapping

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    error::AppError,
    models::ShapeId,
    models::project::{ProjectMetadata, ShapeMapping},
    models::shape::{ShapeResponse, UpsertShapeRequest},
    services::project_service,
    state::AppState,
};

/// Fetch every shape of a project.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "pasture": {
///     "color": "#1A2B3C",
///     "mask": {"rows": 2, "cols": 2, "cells": [1, 0, 0, 0]}
///   }
/// }
/// ```
pub async fn get_all_shapes(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<BTreeMap<ShapeId, ShapeResponse>>, AppError> {
    let shapes = project_service::get_all_shapes(state.dao.as_ref(), &project_id).await?;
    Ok(Json(shapes))
}

/// Delete every shape of a project, masks and metadata entries alike.
pub async fn wipe_all_shapes(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata = project_service::wipe_all_shapes(state.dao.as_ref(), &project_id).await?;
    Ok(Json(metadata))
}

/// Create or replace a shape.
///
/// # Request Body
///
/// Either a finished mask or a polygon drawn over the model image (see
/// `UpsertShapeRequest`). Polygon submissions require the project grid
/// dimensions to be set.
///
/// # Response
///
/// - **Success (200 OK)**: The stored shape (color and rasterized mask)
/// - **Error (400)**: Malformed mask, degenerate polygon, or missing grid
/// - **Error (404)**: No project with this id
pub async fn upsert_shape(
    State(state): State<AppState>,
    Path((project_id, shape_id)): Path<(String, String)>,
    Json(request): Json<UpsertShapeRequest>,
) -> Result<Json<ShapeResponse>, AppError> {
    let shape =
        project_service::save_or_update_shape(state.dao.as_ref(), &project_id, &shape_id, request)
            .await?;
    Ok(Json(shape))
}

/// Delete a single shape.
pub async fn delete_shape(
    State(state): State<AppState>,
    Path((project_id, shape_id)): Path<(String, String)>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata =
        project_service::delete_shape(state.dao.as_ref(), &project_id, &shape_id).await?;
    Ok(Json(metadata))
}

/// Map a shape to its recharge source.
///
/// # Request Body
///
/// ```json
/// {"hydrus": "field-model"}
/// {"manual_value": 0.25}
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: Updated project metadata
/// - **Error (404)**: Unknown shape or Hydrus model
pub async fn map_shape(
    State(state): State<AppState>,
    Path((project_id, shape_id)): Path<(String, String)>,
    Json(mapping): Json<ShapeMapping>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let dao = state.dao.as_ref();
    let metadata = match mapping {
        ShapeMapping::Hydrus(hydrus_id) => {
            project_service::map_shape_to_hydrus(dao, &project_id, &shape_id, &hydrus_id).await?
        }
        ShapeMapping::ManualValue(value) => {
            project_service::map_shape_to_manual_value(dao, &project_id, &shape_id, value).await?
        }
    };
    Ok(Json(metadata))
}

/// Drop a shape's recharge mapping.
pub async fn unmap_shape(
    State(state): State<AppState>,
    Path((project_id, shape_id)): Path<(String, String)>,
) -> Result<Json<ProjectMetadata>, AppError> {
    let metadata =
        project_service::remove_shape_mapping(state.dao.as_ref(), &project_id, &shape_id).await?;
    Ok(Json(metadata))
}
