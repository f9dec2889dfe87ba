//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

/// Which storage backend holds the project data.
///
/// Mirrors the deployment split of the application: `desktop` installs keep
/// projects in a local workspace directory, `docker`/`k8s` installs keep them
/// in a MinIO bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local filesystem workspace (desktop deployments).
    #[default]
    Fs,
    /// S3-compatible MinIO object storage (docker / k8s deployments).
    Minio,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 8080
/// - `STORAGE` (optional): `fs` or `minio`, defaults to `fs`
/// - `WORKSPACE_DIR` (optional): project root for the `fs` backend,
///   defaults to `workspace`
/// - `API_KEY` (optional): when set, all `/api` routes require
///   `Authorization: Bearer <key>`
/// - `MINIO_ENDPOINT`, `MINIO_ACCESS_KEY`, `MINIO_SECRET_KEY`,
///   `MINIO_SECURE`, `MINIO_REGION`, `HMSE_MINIO_ROOT_BUCKET`:
///   required as a group when `STORAGE=minio`
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default)]
    pub storage: StorageBackend,

    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    pub api_key: Option<String>,

    pub minio_endpoint: Option<String>,
    pub minio_access_key: Option<String>,
    pub minio_secret_key: Option<String>,

    #[serde(default)]
    pub minio_secure: bool,

    #[serde(default = "default_region")]
    pub minio_region: String,

    pub hmse_minio_root_bucket: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    8080
}

/// Default project root for the filesystem backend.
fn default_workspace_dir() -> PathBuf {
    PathBuf::from("workspace")
}

/// Default region reported to the object store during request signing.
fn default_region() -> String {
    "us-east-1".to_string()
}

/// Connection settings for the MinIO backend, validated as a group.
#[derive(Debug, Clone)]
pub struct MinioSettings {
    /// Endpoint as `host:port`, optionally prefixed with a scheme.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    /// Use HTTPS when talking to the store.
    pub secure: bool,
    /// Region used in the request signature.
    pub region: String,
    /// Bucket holding all project trees.
    pub root_bucket: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variable values cannot be parsed into
    /// expected types (e.g., a non-numeric `SERVER_PORT`).
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: server_port -> SERVER_PORT
        envy::from_env::<Config>()
    }

    /// Collect the MinIO connection settings.
    ///
    /// Called once at startup when `STORAGE=minio`; fails fast if any of the
    /// required variables is missing so that a misconfigured container does
    /// not come up half-working.
    pub fn minio(&self) -> anyhow::Result<MinioSettings> {
        Ok(MinioSettings {
            endpoint: self
                .minio_endpoint
                .clone()
                .context("MINIO_ENDPOINT must be set when STORAGE=minio")?,
            access_key: self
                .minio_access_key
                .clone()
                .context("MINIO_ACCESS_KEY must be set when STORAGE=minio")?,
            secret_key: self
                .minio_secret_key
                .clone()
                .context("MINIO_SECRET_KEY must be set when STORAGE=minio")?,
            secure: self.minio_secure,
            region: self.minio_region.clone(),
            root_bucket: self
                .hmse_minio_root_bucket
                .clone()
                .context("HMSE_MINIO_ROOT_BUCKET must be set when STORAGE=minio")?,
        })
    }
}
