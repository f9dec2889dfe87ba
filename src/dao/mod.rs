//! Data access layer for the project store.
//!
//! `ProjectDao` is the single seam between the service layer and the storage
//! backend. Both implementations persist the same project tree:
//!
//! ```text
//! <project_id>/metadata.json
//! <project_id>/hydrus/<hydrus_id>/...
//! <project_id>/modflow/<modflow_id>/...
//! <project_id>/weather/<weather_id>
//! <project_id>/shapes/<shape_id>.json
//! ```

/// Local filesystem workspace backend (desktop deployments)
pub mod fs;
/// MinIO object storage backend (docker / k8s deployments)
pub mod minio;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::project::ProjectMetadata;
use crate::models::shape::ShapeMask;

/// Shared handle to the configured storage backend.
pub type Dao = Arc<dyn ProjectDao>;

/// Storage operations on project trees.
///
/// Binary data (model archives, weather files, project downloads) is passed
/// as owned byte buffers; metadata and shape masks as their typed documents.
/// Referential integrity between metadata and the stored binaries is the
/// service layer's job; the DAO only moves bytes.
#[async_trait]
pub trait ProjectDao: Send + Sync {
    /// Verify that the backing store is reachable.
    async fn ping(&self) -> Result<(), AppError>;

    /// Read a project's metadata document.
    async fn read_metadata(&self, project_id: &str) -> Result<ProjectMetadata, AppError>;

    /// List the names of every stored project, sorted.
    async fn read_all_names(&self) -> Result<Vec<String>, AppError>;

    /// Persist a metadata document, creating the project tree if needed.
    async fn save_or_update_metadata(&self, metadata: &ProjectMetadata) -> Result<(), AppError>;

    /// Delete a whole project tree.
    async fn delete_project(&self, project_id: &str) -> Result<(), AppError>;

    /// Pack the whole project tree into a ZIP archive.
    async fn download_project(&self, project_id: &str) -> Result<Vec<u8>, AppError>;

    /// Extract an uploaded Hydrus model archive into the project.
    async fn add_hydrus_model(
        &self,
        project_id: &str,
        hydrus_id: &str,
        archive: Vec<u8>,
    ) -> Result<(), AppError>;

    /// Remove a Hydrus model directory.
    async fn delete_hydrus_model(&self, project_id: &str, hydrus_id: &str)
    -> Result<(), AppError>;

    /// Extract an uploaded Modflow model archive into the project.
    async fn add_modflow_model(
        &self,
        project_id: &str,
        modflow_id: &str,
        archive: Vec<u8>,
    ) -> Result<(), AppError>;

    /// Remove a Modflow model directory.
    async fn delete_modflow_model(
        &self,
        project_id: &str,
        modflow_id: &str,
    ) -> Result<(), AppError>;

    /// Store a weather file as-is.
    async fn add_weather_file(
        &self,
        project_id: &str,
        weather_id: &str,
        data: Vec<u8>,
    ) -> Result<(), AppError>;

    /// Remove a weather file.
    async fn delete_weather_file(
        &self,
        project_id: &str,
        weather_id: &str,
    ) -> Result<(), AppError>;

    /// Read a stored shape mask.
    async fn get_shape(&self, project_id: &str, shape_id: &str) -> Result<ShapeMask, AppError>;

    /// Store a shape mask, replacing any existing one.
    async fn save_or_update_shape(
        &self,
        project_id: &str,
        shape_id: &str,
        mask: &ShapeMask,
    ) -> Result<(), AppError>;

    /// Remove a stored shape mask.
    async fn delete_shape(&self, project_id: &str, shape_id: &str) -> Result<(), AppError>;
}
