//! Shared application state and storage backend selection.
//!
//! This module builds the state that Axum injects into every handler:
//! the configured storage backend behind the `ProjectDao` trait, plus the
//! hashed API key when authentication is enabled.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::config::{Config, StorageBackend};
use crate::dao::{Dao, fs::FsProjectDao, minio::MinioProjectDao};
use crate::minio::MinioClient;

/// State shared by all handlers via Axum's `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// The configured storage backend.
    pub dao: Dao,

    /// SHA-256 (hex) of the configured API key, when auth is enabled.
    pub api_key_hash: Option<String>,
}

impl AppState {
    /// Whether the `/api` routes require a bearer token.
    pub fn requires_auth(&self) -> bool {
        self.api_key_hash.is_some()
    }
}

/// Build the application state from configuration.
///
/// Selects the storage backend: a local workspace directory for desktop
/// installs, or a MinIO root bucket for docker / k8s installs. Backend
/// construction validates its settings eagerly so misconfiguration fails at
/// startup, not on the first request.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let dao: Dao = match config.storage {
        StorageBackend::Fs => {
            tracing::info!("Using filesystem storage at {:?}", config.workspace_dir);
            Arc::new(FsProjectDao::new(config.workspace_dir.clone()).await?)
        }
        StorageBackend::Minio => {
            let settings = config.minio()?;
            tracing::info!(
                "Using MinIO storage at {} (bucket {})",
                settings.endpoint,
                settings.root_bucket
            );
            Arc::new(MinioProjectDao::new(MinioClient::new(&settings)?))
        }
    };

    let api_key_hash = config
        .api_key
        .as_deref()
        .map(|key| hex::encode(Sha256::digest(key.as_bytes())));

    Ok(AppState { dao, api_key_hash })
}
