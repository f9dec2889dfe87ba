//! Project service - Core business logic for the project store.
//!
//! Every operation follows the same read-modify-write pattern: read the
//! metadata document, mutate it in memory (which enforces the integrity
//! rules), apply the binary-side DAO call, persist the document. The DAO
//! itself never inspects metadata, so all cross-reference checks live here
//! and in `ProjectMetadata`.

use std::collections::BTreeMap;

use crate::dao::ProjectDao;
use crate::error::AppError;
use crate::models::project::{ModflowMetadata, ProjectMetadata};
use crate::models::shape::{
    ShapeGeometry, ShapeMask, ShapeResponse, UpsertShapeRequest, scale_polygon,
    random_html_color,
};
use crate::models::{ShapeColor, ShapeId};

/// Check that an identifier is safe to use as a path / object key segment.
///
/// Identifiers name directories and objects directly, so they must not be
/// empty, overly long, or contain separators or parent references.
///
/// # Errors
///
/// `InvalidRequest` naming the offending identifier kind.
pub fn validate_id(kind: &str, id: &str) -> Result<(), AppError> {
    let well_formed = !id.is_empty()
        && id.len() <= 128
        && !id.starts_with('.')
        && !id.contains("..")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '));
    if well_formed {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!("Invalid {kind} id: {id:?}")))
    }
}

/// Largest accepted grid dimension. Shape masks are dense `rows * cols`
/// buffers allocated from these values, so unbounded dimensions in a
/// metadata document would let one request exhaust memory.
const MAX_GRID_DIMENSION: u32 = 2048;

fn validate_grid_dimension(kind: &str, value: Option<u32>) -> Result<(), AppError> {
    match value {
        Some(v) if v == 0 || v > MAX_GRID_DIMENSION => Err(AppError::InvalidRequest(format!(
            "Grid {kind} must be between 1 and {MAX_GRID_DIMENSION}, got {v}"
        ))),
        _ => Ok(()),
    }
}

/// Check the grid geometry of an incoming metadata document.
fn validate_metadata(metadata: &ProjectMetadata) -> Result<(), AppError> {
    validate_grid_dimension("rows", metadata.rows)?;
    validate_grid_dimension("cols", metadata.cols)?;
    if let Some(modflow) = &metadata.modflow_metadata {
        validate_grid_dimension("rows", modflow.rows)?;
        validate_grid_dimension("cols", modflow.cols)?;
    }
    Ok(())
}

/// Read a project's metadata.
pub async fn get(dao: &dyn ProjectDao, project_id: &str) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    dao.read_metadata(project_id).await
}

/// List the names of all stored projects.
pub async fn get_all_project_names(dao: &dyn ProjectDao) -> Result<Vec<String>, AppError> {
    dao.read_all_names().await
}

/// Create a new project from a metadata document.
///
/// # Errors
///
/// `DuplicateProject` when a project with this id already exists.
pub async fn create(
    dao: &dyn ProjectDao,
    metadata: ProjectMetadata,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", &metadata.project_id)?;
    validate_metadata(&metadata)?;
    match dao.read_metadata(&metadata.project_id).await {
        Ok(_) => return Err(AppError::DuplicateProject(metadata.project_id.clone())),
        Err(AppError::ProjectNotFound(_)) => {}
        Err(e) => return Err(e),
    }
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Replace a project's metadata document.
///
/// The id in the URL wins over the one in the body; the project must exist.
pub async fn save_or_update_metadata(
    dao: &dyn ProjectDao,
    project_id: &str,
    mut metadata: ProjectMetadata,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    validate_metadata(&metadata)?;
    dao.read_metadata(project_id).await?;
    metadata.project_id = project_id.to_string();
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Delete a project and everything stored under it.
pub async fn delete(dao: &dyn ProjectDao, project_id: &str) -> Result<(), AppError> {
    validate_id("project", project_id)?;
    dao.delete_project(project_id).await
}

/// Pack a whole project into a ZIP archive for download.
pub async fn download_project(
    dao: &dyn ProjectDao,
    project_id: &str,
) -> Result<Vec<u8>, AppError> {
    validate_id("project", project_id)?;
    dao.download_project(project_id).await
}

/// Whether the simulation for a project has finished.
pub async fn is_finished(dao: &dyn ProjectDao, project_id: &str) -> Result<bool, AppError> {
    Ok(get(dao, project_id).await?.finished)
}

/// Store an uploaded Hydrus model archive and register it in the metadata.
pub async fn add_hydrus_model(
    dao: &dyn ProjectDao,
    project_id: &str,
    hydrus_id: &str,
    archive: Vec<u8>,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    validate_id("hydrus model", hydrus_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.add_hydrus_model(hydrus_id);
    dao.add_hydrus_model(project_id, hydrus_id, archive).await?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Remove a Hydrus model and every mapping that references it.
pub async fn delete_hydrus_model(
    dao: &dyn ProjectDao,
    project_id: &str,
    hydrus_id: &str,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    validate_id("hydrus model", hydrus_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.remove_hydrus_model(hydrus_id)?;
    dao.delete_hydrus_model(project_id, hydrus_id).await?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Store an uploaded Modflow model archive, replacing any previous model.
pub async fn set_modflow_model(
    dao: &dyn ProjectDao,
    project_id: &str,
    modflow_id: &str,
    archive: Vec<u8>,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    validate_id("modflow model", modflow_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;

    // A project has at most one Modflow model.
    if let Some(previous) = &metadata.modflow_metadata {
        let previous_id = previous.modflow_id.clone();
        dao.delete_modflow_model(project_id, &previous_id).await?;
    }

    metadata.set_modflow_metadata(ModflowMetadata::new(modflow_id));
    dao.add_modflow_model(project_id, modflow_id, archive).await?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Remove the project's Modflow model.
pub async fn delete_modflow_model(
    dao: &dyn ProjectDao,
    project_id: &str,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    let modflow_id = metadata.remove_modflow_metadata()?;
    dao.delete_modflow_model(project_id, &modflow_id).await?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Store a weather file and register it in the metadata.
pub async fn add_weather_file(
    dao: &dyn ProjectDao,
    project_id: &str,
    weather_id: &str,
    data: Vec<u8>,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    validate_id("weather file", weather_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.add_weather_file(weather_id);
    dao.add_weather_file(project_id, weather_id, data).await?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Remove a weather file and the Hydrus assignments that use it.
pub async fn delete_weather_file(
    dao: &dyn ProjectDao,
    project_id: &str,
    weather_id: &str,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    validate_id("weather file", weather_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.remove_weather_file(weather_id)?;
    dao.delete_weather_file(project_id, weather_id).await?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Delete every shape of a project, both masks and metadata entries.
pub async fn wipe_all_shapes(
    dao: &dyn ProjectDao,
    project_id: &str,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    let shape_ids: Vec<ShapeId> = metadata.shapes.keys().cloned().collect();
    for shape_id in &shape_ids {
        dao.delete_shape(project_id, shape_id).await?;
    }
    metadata.shapes.clear();
    metadata.shapes_to_hydrus.clear();
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Fetch every shape of a project with its mask and color.
pub async fn get_all_shapes(
    dao: &dyn ProjectDao,
    project_id: &str,
) -> Result<BTreeMap<ShapeId, ShapeResponse>, AppError> {
    validate_id("project", project_id)?;
    let metadata = dao.read_metadata(project_id).await?;
    let mut shapes = BTreeMap::new();
    for (shape_id, color) in &metadata.shapes {
        let mask = dao.get_shape(project_id, shape_id).await?;
        shapes.insert(
            shape_id.clone(),
            ShapeResponse {
                color: color.clone(),
                mask,
            },
        );
    }
    Ok(shapes)
}

/// Store or replace a shape from an upload.
///
/// Mask payloads are validated and used as-is. Polygon payloads are scaled
/// from image pixel space onto the project grid and rasterized, which
/// requires the grid dimensions to be set on the project. When no color is
/// given, the shape keeps its previous color or receives a random one.
pub async fn save_or_update_shape(
    dao: &dyn ProjectDao,
    project_id: &str,
    shape_id: &str,
    request: UpsertShapeRequest,
) -> Result<ShapeResponse, AppError> {
    validate_id("project", project_id)?;
    validate_id("shape", shape_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;

    let mask = match request.geometry {
        ShapeGeometry::Mask(mask) => {
            mask.validate()?;
            mask
        }
        ShapeGeometry::Polygon {
            vertices,
            source_width,
            source_height,
        } => {
            let (rows, cols) = match (metadata.rows, metadata.cols) {
                (Some(rows), Some(cols)) => (rows, cols),
                _ => {
                    return Err(AppError::InvalidRequest(
                        "Polygon shapes require the project grid dimensions to be set".to_string(),
                    ));
                }
            };
            let scaled = scale_polygon(&vertices, source_width, source_height, rows, cols)?;
            ShapeMask::from_polygon(&scaled, rows, cols)
        }
    };

    let color: ShapeColor = request
        .color
        .or_else(|| metadata.shapes.get(shape_id).cloned())
        .unwrap_or_else(random_html_color);

    dao.save_or_update_shape(project_id, shape_id, &mask).await?;
    metadata.add_shape_metadata(shape_id, color.clone());
    dao.save_or_update_metadata(&metadata).await?;

    Ok(ShapeResponse { color, mask })
}

/// Delete a single shape, mask and metadata entry alike.
pub async fn delete_shape(
    dao: &dyn ProjectDao,
    project_id: &str,
    shape_id: &str,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    validate_id("shape", shape_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.remove_shape(shape_id)?;
    dao.delete_shape(project_id, shape_id).await?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Map a shape to a Hydrus model.
pub async fn map_shape_to_hydrus(
    dao: &dyn ProjectDao,
    project_id: &str,
    shape_id: &str,
    hydrus_id: &str,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.map_shape_to_hydrus(shape_id, hydrus_id)?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Map a shape to a constant recharge value.
pub async fn map_shape_to_manual_value(
    dao: &dyn ProjectDao,
    project_id: &str,
    shape_id: &str,
    value: f64,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.map_shape_to_manual_value(shape_id, value)?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Assign a weather file to a Hydrus model.
pub async fn map_hydrus_to_weather_file(
    dao: &dyn ProjectDao,
    project_id: &str,
    hydrus_id: &str,
    weather_id: &str,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.map_hydrus_to_weather(hydrus_id, weather_id)?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Drop a shape's recharge mapping.
pub async fn remove_shape_mapping(
    dao: &dyn ProjectDao,
    project_id: &str,
    shape_id: &str,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.remove_shape_mapping(shape_id)?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

/// Drop the weather assignment of a Hydrus model.
pub async fn remove_weather_hydrus_mapping(
    dao: &dyn ProjectDao,
    project_id: &str,
    hydrus_id: &str,
) -> Result<ProjectMetadata, AppError> {
    validate_id("project", project_id)?;
    let mut metadata = dao.read_metadata(project_id).await?;
    metadata.remove_hydrus_weather_mapping(hydrus_id)?;
    dao.save_or_update_metadata(&metadata).await?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::pack_archive;
    use crate::dao::fs::FsProjectDao;
    use tempfile::TempDir;

    async fn fs_dao(tmp: &TempDir) -> FsProjectDao {
        FsProjectDao::new(tmp.path().join("workspace")).await.unwrap()
    }

    fn hydrus_archive() -> Vec<u8> {
        pack_archive(&[("SELECTOR.IN".to_string(), b"selector".to_vec())]).unwrap()
    }

    #[test]
    fn id_validation_rejects_traversal_and_separators() {
        assert!(validate_id("project", "my-project_1.2").is_ok());
        assert!(validate_id("weather file", "station 3.csv").is_ok());
        assert!(validate_id("project", "").is_err());
        assert!(validate_id("project", "a/b").is_err());
        assert!(validate_id("project", "..").is_err());
        assert!(validate_id("project", "a..b").is_err());
        assert!(validate_id("project", ".hidden").is_err());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_projects() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();

        let err = create(&dao, ProjectMetadata::new("p1")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateProject(id) if id == "p1"));
        assert_eq!(get_all_project_names(&dao).await.unwrap(), vec!["p1"]);
    }

    #[tokio::test]
    async fn update_keeps_the_url_project_id() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();

        let mut body = ProjectMetadata::new("other-name");
        body.finished = true;
        let updated = save_or_update_metadata(&dao, "p1", body).await.unwrap();

        assert_eq!(updated.project_id, "p1");
        assert!(is_finished(&dao, "p1").await.unwrap());
    }

    #[tokio::test]
    async fn oversized_grid_dimensions_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();

        let mut huge = ProjectMetadata::new("p1");
        huge.rows = Some(1_000_000);
        huge.cols = Some(1_000_000);
        assert!(matches!(
            save_or_update_metadata(&dao, "p1", huge).await.unwrap_err(),
            AppError::InvalidRequest(_)
        ));

        let mut zero = ProjectMetadata::new("p2");
        zero.rows = Some(0);
        assert!(matches!(
            create(&dao, zero).await.unwrap_err(),
            AppError::InvalidRequest(_)
        ));

        // A document inside the bound is stored as-is.
        let mut fine = ProjectMetadata::new("p1");
        fine.rows = Some(500);
        fine.cols = Some(500);
        save_or_update_metadata(&dao, "p1", fine).await.unwrap();
    }

    #[tokio::test]
    async fn hydrus_upload_registers_the_model() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();

        let metadata = add_hydrus_model(&dao, "p1", "h1", hydrus_archive())
            .await
            .unwrap();
        assert!(metadata.hydrus_models.contains("h1"));

        let metadata = delete_hydrus_model(&dao, "p1", "h1").await.unwrap();
        assert!(metadata.hydrus_models.is_empty());
        assert!(matches!(
            delete_hydrus_model(&dao, "p1", "h1").await.unwrap_err(),
            AppError::UnknownHydrusModel(_)
        ));
    }

    #[tokio::test]
    async fn second_modflow_upload_replaces_the_first() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();

        set_modflow_model(&dao, "p1", "mf-a", hydrus_archive())
            .await
            .unwrap();
        let metadata = set_modflow_model(&dao, "p1", "mf-b", hydrus_archive())
            .await
            .unwrap();

        assert_eq!(
            metadata.modflow_metadata.as_ref().map(|m| m.modflow_id.as_str()),
            Some("mf-b")
        );
        // The first model's directory is gone from the workspace.
        assert!(
            !tokio::fs::try_exists(tmp.path().join("workspace/p1/modflow/mf-a"))
                .await
                .unwrap()
        );

        delete_modflow_model(&dao, "p1").await.unwrap();
        assert!(matches!(
            delete_modflow_model(&dao, "p1").await.unwrap_err(),
            AppError::UnknownModflowModel
        ));
    }

    #[tokio::test]
    async fn weather_files_and_mappings_stay_consistent() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();
        add_hydrus_model(&dao, "p1", "h1", hydrus_archive())
            .await
            .unwrap();
        add_weather_file(&dao, "p1", "station.csv", b"day,rain\n".to_vec())
            .await
            .unwrap();

        let metadata = map_hydrus_to_weather_file(&dao, "p1", "h1", "station.csv")
            .await
            .unwrap();
        assert_eq!(
            metadata.hydrus_to_weather.get("h1").map(String::as_str),
            Some("station.csv")
        );

        let metadata = delete_weather_file(&dao, "p1", "station.csv").await.unwrap();
        assert!(metadata.hydrus_to_weather.is_empty());
        assert!(matches!(
            map_hydrus_to_weather_file(&dao, "p1", "h1", "station.csv")
                .await
                .unwrap_err(),
            AppError::UnknownWeatherFile(_)
        ));
    }

    #[tokio::test]
    async fn mask_shape_upsert_and_mapping_flow() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();
        add_hydrus_model(&dao, "p1", "h1", hydrus_archive())
            .await
            .unwrap();

        let request: UpsertShapeRequest = serde_json::from_str(
            r##"{"color": "#112233", "mask": {"rows": 2, "cols": 2, "cells": [1, 1, 0, 0]}}"##,
        )
        .unwrap();
        let shape = save_or_update_shape(&dao, "p1", "s1", request).await.unwrap();
        assert_eq!(shape.color, "#112233");
        assert_eq!(shape.mask.coverage(), 2);

        map_shape_to_hydrus(&dao, "p1", "s1", "h1").await.unwrap();
        let metadata = map_shape_to_manual_value(&dao, "p1", "s1", 0.75)
            .await
            .unwrap();
        assert_eq!(
            metadata.shapes_to_hydrus.get("s1"),
            Some(&crate::models::project::ShapeMapping::ManualValue(0.75))
        );

        let metadata = remove_shape_mapping(&dao, "p1", "s1").await.unwrap();
        assert!(metadata.shapes_to_hydrus.is_empty());

        let shapes = get_all_shapes(&dao, "p1").await.unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes["s1"].mask.coverage(), 2);
    }

    #[tokio::test]
    async fn polygon_shape_requires_grid_dimensions() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();

        let request: UpsertShapeRequest = serde_json::from_str(
            r#"{"polygon": {"vertices": [[0, 0], [199, 0], [199, 159], [0, 159]],
                "source_width": 200, "source_height": 160}}"#,
        )
        .unwrap();
        let err = save_or_update_shape(&dao, "p1", "s1", request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        // With grid dimensions set, the polygon is rasterized onto the grid.
        let mut metadata = get(&dao, "p1").await.unwrap();
        metadata.rows = Some(5);
        metadata.cols = Some(9);
        save_or_update_metadata(&dao, "p1", metadata).await.unwrap();

        let request: UpsertShapeRequest = serde_json::from_str(
            r#"{"polygon": {"vertices": [[0, 0], [199, 0], [199, 159], [0, 159]],
                "source_width": 200, "source_height": 160}}"#,
        )
        .unwrap();
        let shape = save_or_update_shape(&dao, "p1", "s1", request).await.unwrap();
        assert!(shape.mask.coverage() > 0);
        assert_eq!(shape.mask.rows, 5);
        assert_eq!(shape.mask.cols, 9);
        assert!(shape.color.starts_with('#'));
    }

    #[tokio::test]
    async fn wipe_all_shapes_clears_masks_and_metadata() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();

        for shape_id in ["s1", "s2"] {
            let request: UpsertShapeRequest = serde_json::from_str(
                r#"{"mask": {"rows": 1, "cols": 2, "cells": [1, 0]}}"#,
            )
            .unwrap();
            save_or_update_shape(&dao, "p1", shape_id, request).await.unwrap();
        }

        let metadata = wipe_all_shapes(&dao, "p1").await.unwrap();
        assert!(metadata.shapes.is_empty());
        assert!(get_all_shapes(&dao, "p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_shape_requires_it_to_exist() {
        let tmp = TempDir::new().unwrap();
        let dao = fs_dao(&tmp).await;
        create(&dao, ProjectMetadata::new("p1")).await.unwrap();

        assert!(matches!(
            delete_shape(&dao, "p1", "ghost").await.unwrap_err(),
            AppError::UnknownShape(_)
        ));
    }
}
