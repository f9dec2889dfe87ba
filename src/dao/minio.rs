//! MinIO implementation of the project DAO.
//!
//! Docker and k8s deployments keep project trees under a root bucket, one
//! object per file, with the project id as the top-level key prefix. Model
//! archives are unpacked on upload so the bucket mirrors the filesystem
//! layout of the desktop backend.

use async_trait::async_trait;

use crate::archive;
use crate::dao::ProjectDao;
use crate::error::AppError;
use crate::minio::MinioClient;
use crate::models::project::ProjectMetadata;
use crate::models::shape::ShapeMask;

/// Project DAO over a MinIO root bucket.
#[derive(Debug, Clone)]
pub struct MinioProjectDao {
    client: MinioClient,
}

impl MinioProjectDao {
    pub fn new(client: MinioClient) -> Self {
        MinioProjectDao { client }
    }

    fn metadata_key(project_id: &str) -> String {
        format!("{project_id}/metadata.json")
    }

    fn shape_key(project_id: &str, shape_id: &str) -> String {
        format!("{project_id}/shapes/{shape_id}.json")
    }

    /// Map a missing metadata object to `ProjectNotFound`.
    async fn metadata_opt(&self, project_id: &str) -> Result<Option<ProjectMetadata>, AppError> {
        match self.client.get_object_opt(&Self::metadata_key(project_id)).await? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProjectDao for MinioProjectDao {
    async fn ping(&self) -> Result<(), AppError> {
        self.client.ping().await
    }

    async fn read_metadata(&self, project_id: &str) -> Result<ProjectMetadata, AppError> {
        self.metadata_opt(project_id)
            .await?
            .ok_or_else(|| AppError::ProjectNotFound(project_id.to_string()))
    }

    async fn read_all_names(&self) -> Result<Vec<String>, AppError> {
        let mut names = self.client.list_common_prefixes("").await?;
        names.sort();
        Ok(names)
    }

    async fn save_or_update_metadata(&self, metadata: &ProjectMetadata) -> Result<(), AppError> {
        self.client
            .put_json(&Self::metadata_key(&metadata.project_id), metadata)
            .await
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), AppError> {
        let deleted = self.client.delete_prefix(&format!("{project_id}/")).await?;
        if deleted == 0 {
            return Err(AppError::ProjectNotFound(project_id.to_string()));
        }
        Ok(())
    }

    async fn download_project(&self, project_id: &str) -> Result<Vec<u8>, AppError> {
        let prefix = format!("{project_id}/");
        let keys = self.client.list_keys(&prefix).await?;
        if keys.is_empty() {
            return Err(AppError::ProjectNotFound(project_id.to_string()));
        }
        let mut files = Vec::with_capacity(keys.len());
        for key in keys {
            let content = self.client.get_object(&key).await?;
            let relative = key
                .strip_prefix(&prefix)
                .unwrap_or(key.as_str())
                .to_string();
            files.push((relative, content));
        }
        tokio::task::spawn_blocking(move || archive::pack_archive(&files)).await?
    }

    async fn add_hydrus_model(
        &self,
        project_id: &str,
        hydrus_id: &str,
        archive: Vec<u8>,
    ) -> Result<(), AppError> {
        let entries =
            tokio::task::spawn_blocking(move || archive::unpack_archive(&archive)).await??;
        for (name, content) in entries {
            let key = format!("{project_id}/hydrus/{hydrus_id}/{name}");
            self.client
                .put_object(&key, content, "application/octet-stream")
                .await?;
        }
        Ok(())
    }

    async fn delete_hydrus_model(
        &self,
        project_id: &str,
        hydrus_id: &str,
    ) -> Result<(), AppError> {
        self.client
            .delete_prefix(&format!("{project_id}/hydrus/{hydrus_id}/"))
            .await?;
        Ok(())
    }

    async fn add_modflow_model(
        &self,
        project_id: &str,
        modflow_id: &str,
        archive: Vec<u8>,
    ) -> Result<(), AppError> {
        let entries =
            tokio::task::spawn_blocking(move || archive::unpack_archive(&archive)).await??;
        for (name, content) in entries {
            let key = format!("{project_id}/modflow/{modflow_id}/{name}");
            self.client
                .put_object(&key, content, "application/octet-stream")
                .await?;
        }
        Ok(())
    }

    async fn delete_modflow_model(
        &self,
        project_id: &str,
        modflow_id: &str,
    ) -> Result<(), AppError> {
        self.client
            .delete_prefix(&format!("{project_id}/modflow/{modflow_id}/"))
            .await?;
        Ok(())
    }

    async fn add_weather_file(
        &self,
        project_id: &str,
        weather_id: &str,
        data: Vec<u8>,
    ) -> Result<(), AppError> {
        self.client
            .put_object(
                &format!("{project_id}/weather/{weather_id}"),
                data,
                "application/octet-stream",
            )
            .await
    }

    async fn delete_weather_file(
        &self,
        project_id: &str,
        weather_id: &str,
    ) -> Result<(), AppError> {
        self.client
            .delete_object(&format!("{project_id}/weather/{weather_id}"))
            .await
    }

    async fn get_shape(&self, project_id: &str, shape_id: &str) -> Result<ShapeMask, AppError> {
        match self
            .client
            .get_object_opt(&Self::shape_key(project_id, shape_id))
            .await?
        {
            Some(data) => Ok(serde_json::from_slice(&data)?),
            None => Err(AppError::UnknownShape(shape_id.to_string())),
        }
    }

    async fn save_or_update_shape(
        &self,
        project_id: &str,
        shape_id: &str,
        mask: &ShapeMask,
    ) -> Result<(), AppError> {
        self.client
            .put_json(&Self::shape_key(project_id, shape_id), mask)
            .await
    }

    async fn delete_shape(&self, project_id: &str, shape_id: &str) -> Result<(), AppError> {
        self.client
            .delete_object(&Self::shape_key(project_id, shape_id))
            .await
    }
}
