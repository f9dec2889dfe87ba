//! Filesystem implementation of the project DAO.
//!
//! Desktop deployments keep every project as a directory tree under a
//! configurable workspace root. Metadata and shape masks are pretty-printed
//! JSON files; model archives are extracted on upload so the workspace holds
//! plain model directories, mirroring what the simulation engines expect.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::archive;
use crate::dao::ProjectDao;
use crate::error::AppError;
use crate::models::project::ProjectMetadata;
use crate::models::shape::ShapeMask;

/// Project DAO rooted at a workspace directory.
#[derive(Debug, Clone)]
pub struct FsProjectDao {
    root: PathBuf,
}

impl FsProjectDao {
    /// Open (and create if missing) the workspace root.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(FsProjectDao { root })
    }

    fn project_dir(&self, project_id: &str) -> PathBuf {
        self.root.join(project_id)
    }

    fn metadata_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join("metadata.json")
    }

    fn shape_path(&self, project_id: &str, shape_id: &str) -> PathBuf {
        self.project_dir(project_id)
            .join("shapes")
            .join(format!("{shape_id}.json"))
    }

    /// Error with `ProjectNotFound` unless the project's metadata file exists.
    async fn ensure_project(&self, project_id: &str) -> Result<(), AppError> {
        if tokio::fs::try_exists(self.metadata_path(project_id)).await? {
            Ok(())
        } else {
            Err(AppError::ProjectNotFound(project_id.to_string()))
        }
    }

    /// Write extracted archive entries under `base`.
    async fn write_entries(
        &self,
        base: &Path,
        entries: Vec<(String, Vec<u8>)>,
    ) -> Result<(), AppError> {
        for (name, content) in entries {
            let target = base.join(&name);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, content).await?;
        }
        Ok(())
    }

    /// Remove a directory, treating an already-missing one as success.
    async fn remove_dir_if_present(&self, dir: PathBuf) -> Result<(), AppError> {
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Recursively collect `(relative path, content)` pairs under `base`, sorted
/// by path. Runs on the blocking pool.
fn collect_files(base: &Path) -> io::Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();
    let mut stack = vec![base.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else {
                let relative = path
                    .strip_prefix(base)
                    .map_err(io::Error::other)?
                    .to_string_lossy()
                    .replace('\\', "/");
                files.push((relative, std::fs::read(&path)?));
            }
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[async_trait]
impl ProjectDao for FsProjectDao {
    async fn ping(&self) -> Result<(), AppError> {
        tokio::fs::read_dir(&self.root).await?;
        Ok(())
    }

    async fn read_metadata(&self, project_id: &str) -> Result<ProjectMetadata, AppError> {
        let data = match tokio::fs::read(self.metadata_path(project_id)).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AppError::ProjectNotFound(project_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    async fn read_all_names(&self) -> Result<Vec<String>, AppError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            // Only directories with a metadata document are projects.
            if tokio::fs::try_exists(self.metadata_path(&name)).await? {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn save_or_update_metadata(&self, metadata: &ProjectMetadata) -> Result<(), AppError> {
        tokio::fs::create_dir_all(self.project_dir(&metadata.project_id)).await?;
        let data = serde_json::to_vec_pretty(metadata)?;
        tokio::fs::write(self.metadata_path(&metadata.project_id), data).await?;
        Ok(())
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), AppError> {
        self.ensure_project(project_id).await?;
        tokio::fs::remove_dir_all(self.project_dir(project_id)).await?;
        Ok(())
    }

    async fn download_project(&self, project_id: &str) -> Result<Vec<u8>, AppError> {
        self.ensure_project(project_id).await?;
        let dir = self.project_dir(project_id);
        tokio::task::spawn_blocking(move || {
            let files = collect_files(&dir)?;
            archive::pack_archive(&files)
        })
        .await?
    }

    async fn add_hydrus_model(
        &self,
        project_id: &str,
        hydrus_id: &str,
        archive: Vec<u8>,
    ) -> Result<(), AppError> {
        self.ensure_project(project_id).await?;
        let entries = tokio::task::spawn_blocking(move || archive::unpack_archive(&archive)).await??;
        let base = self.project_dir(project_id).join("hydrus").join(hydrus_id);
        self.write_entries(&base, entries).await
    }

    async fn delete_hydrus_model(
        &self,
        project_id: &str,
        hydrus_id: &str,
    ) -> Result<(), AppError> {
        self.ensure_project(project_id).await?;
        self.remove_dir_if_present(self.project_dir(project_id).join("hydrus").join(hydrus_id))
            .await
    }

    async fn add_modflow_model(
        &self,
        project_id: &str,
        modflow_id: &str,
        archive: Vec<u8>,
    ) -> Result<(), AppError> {
        self.ensure_project(project_id).await?;
        let entries = tokio::task::spawn_blocking(move || archive::unpack_archive(&archive)).await??;
        let base = self.project_dir(project_id).join("modflow").join(modflow_id);
        self.write_entries(&base, entries).await
    }

    async fn delete_modflow_model(
        &self,
        project_id: &str,
        modflow_id: &str,
    ) -> Result<(), AppError> {
        self.ensure_project(project_id).await?;
        self.remove_dir_if_present(self.project_dir(project_id).join("modflow").join(modflow_id))
            .await
    }

    async fn add_weather_file(
        &self,
        project_id: &str,
        weather_id: &str,
        data: Vec<u8>,
    ) -> Result<(), AppError> {
        self.ensure_project(project_id).await?;
        let dir = self.project_dir(project_id).join("weather");
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(weather_id), data).await?;
        Ok(())
    }

    async fn delete_weather_file(
        &self,
        project_id: &str,
        weather_id: &str,
    ) -> Result<(), AppError> {
        self.ensure_project(project_id).await?;
        match tokio::fs::remove_file(self.project_dir(project_id).join("weather").join(weather_id))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_shape(&self, project_id: &str, shape_id: &str) -> Result<ShapeMask, AppError> {
        let data = match tokio::fs::read(self.shape_path(project_id, shape_id)).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AppError::UnknownShape(shape_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    async fn save_or_update_shape(
        &self,
        project_id: &str,
        shape_id: &str,
        mask: &ShapeMask,
    ) -> Result<(), AppError> {
        self.ensure_project(project_id).await?;
        let dir = self.project_dir(project_id).join("shapes");
        tokio::fs::create_dir_all(&dir).await?;
        let data = serde_json::to_vec_pretty(mask)?;
        tokio::fs::write(self.shape_path(project_id, shape_id), data).await?;
        Ok(())
    }

    async fn delete_shape(&self, project_id: &str, shape_id: &str) -> Result<(), AppError> {
        self.ensure_project(project_id).await?;
        match tokio::fs::remove_file(self.shape_path(project_id, shape_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{pack_archive, unpack_archive};
    use tempfile::TempDir;

    async fn dao_in(tmp: &TempDir) -> FsProjectDao {
        FsProjectDao::new(tmp.path().join("workspace")).await.unwrap()
    }

    async fn seed_project(dao: &FsProjectDao, project_id: &str) -> ProjectMetadata {
        let metadata = ProjectMetadata::new(project_id);
        dao.save_or_update_metadata(&metadata).await.unwrap();
        metadata
    }

    #[tokio::test]
    async fn metadata_round_trips_through_disk() {
        let tmp = TempDir::new().unwrap();
        let dao = dao_in(&tmp).await;
        let mut metadata = seed_project(&dao, "p1").await;
        metadata.add_hydrus_model("h1");
        dao.save_or_update_metadata(&metadata).await.unwrap();

        let read = dao.read_metadata("p1").await.unwrap();
        assert_eq!(read, metadata);
    }

    #[tokio::test]
    async fn missing_project_is_project_not_found() {
        let tmp = TempDir::new().unwrap();
        let dao = dao_in(&tmp).await;
        assert!(matches!(
            dao.read_metadata("ghost").await.unwrap_err(),
            AppError::ProjectNotFound(id) if id == "ghost"
        ));
        assert!(matches!(
            dao.delete_project("ghost").await.unwrap_err(),
            AppError::ProjectNotFound(_)
        ));
    }

    #[tokio::test]
    async fn read_all_names_lists_only_project_directories() {
        let tmp = TempDir::new().unwrap();
        let dao = dao_in(&tmp).await;
        seed_project(&dao, "beta").await;
        seed_project(&dao, "alpha").await;
        // A stray directory without metadata is not a project.
        tokio::fs::create_dir(tmp.path().join("workspace").join("lost+found"))
            .await
            .unwrap();

        assert_eq!(dao.read_all_names().await.unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn hydrus_archive_is_extracted_into_the_project_tree() {
        let tmp = TempDir::new().unwrap();
        let dao = dao_in(&tmp).await;
        seed_project(&dao, "p1").await;

        let archive = pack_archive(&[
            ("SELECTOR.IN".to_string(), b"selector".to_vec()),
            ("meteo/METEO.IN".to_string(), b"meteo".to_vec()),
        ])
        .unwrap();
        dao.add_hydrus_model("p1", "h1", archive).await.unwrap();

        let extracted = tmp
            .path()
            .join("workspace/p1/hydrus/h1/meteo/METEO.IN");
        assert_eq!(tokio::fs::read(extracted).await.unwrap(), b"meteo");

        dao.delete_hydrus_model("p1", "h1").await.unwrap();
        assert!(
            !tokio::fs::try_exists(tmp.path().join("workspace/p1/hydrus/h1"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn download_packs_the_whole_project_tree() {
        let tmp = TempDir::new().unwrap();
        let dao = dao_in(&tmp).await;
        seed_project(&dao, "p1").await;
        dao.add_weather_file("p1", "station.csv", b"day,rain\n".to_vec())
            .await
            .unwrap();

        let archive = dao.download_project("p1").await.unwrap();
        let entries = unpack_archive(&archive).unwrap();
        let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["metadata.json", "weather/station.csv"]);
    }

    #[tokio::test]
    async fn shapes_round_trip_and_delete() {
        let tmp = TempDir::new().unwrap();
        let dao = dao_in(&tmp).await;
        seed_project(&dao, "p1").await;

        let mut mask = ShapeMask::zeros(2, 2);
        mask.set(0, 0, true);
        dao.save_or_update_shape("p1", "s1", &mask).await.unwrap();
        assert_eq!(dao.get_shape("p1", "s1").await.unwrap(), mask);

        dao.delete_shape("p1", "s1").await.unwrap();
        assert!(matches!(
            dao.get_shape("p1", "s1").await.unwrap_err(),
            AppError::UnknownShape(_)
        ));
    }

    #[tokio::test]
    async fn delete_project_removes_everything() {
        let tmp = TempDir::new().unwrap();
        let dao = dao_in(&tmp).await;
        seed_project(&dao, "p1").await;
        dao.add_weather_file("p1", "w", b"x".to_vec()).await.unwrap();

        dao.delete_project("p1").await.unwrap();
        assert!(dao.read_all_names().await.unwrap().is_empty());
    }
}
