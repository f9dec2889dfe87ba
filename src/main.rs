//! HMSE Project Store - Main Application Entry Point
//!
//! This is a REST API server that stores and versions the project data of the
//! HMSE application (metadata, Hydrus and Modflow model files, weather files,
//! shape masks). HMSE-frontend consumes it for every deployment target.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: pluggable `ProjectDao` - local workspace directory
//!   (desktop) or MinIO object storage (docker / k8s)
//! - **Authentication**: optional shared API key with SHA-256 hashing
//! - **Format**: JSON metadata; raw ZIP bodies for model archives
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Build the storage backend (create workspace dir / validate MinIO settings)
//! 3. Build HTTP router with routes and middleware
//! 4. Start server on configured port

mod archive;
mod config;
mod dao;
mod error;
mod handlers;
mod middleware;
mod minio;
mod models;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Upper bound on upload bodies. Modflow decks routinely exceed the
/// framework's 2 MB default, so the limit is raised on the whole API router.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Build the HTTP router over prepared application state.
fn build_router(state: AppState) -> Router {
    // Project data routes (API endpoints)
    let mut api_routes = Router::new()
        // Project lifecycle routes
        .route(
            "/api/v1/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/api/v1/projects/{id}",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .route(
            "/api/v1/projects/{id}/download",
            get(handlers::projects::download_project),
        )
        // Simulation input file routes
        .route(
            "/api/v1/projects/{id}/hydrus/{hydrus_id}",
            put(handlers::model_files::upload_hydrus_model)
                .delete(handlers::model_files::delete_hydrus_model),
        )
        .route(
            "/api/v1/projects/{id}/modflow/{modflow_id}",
            put(handlers::model_files::upload_modflow_model),
        )
        .route(
            "/api/v1/projects/{id}/modflow",
            delete(handlers::model_files::delete_modflow_model),
        )
        .route(
            "/api/v1/projects/{id}/weather/{weather_id}",
            put(handlers::model_files::upload_weather_file)
                .delete(handlers::model_files::delete_weather_file),
        )
        .route(
            "/api/v1/projects/{id}/hydrus/{hydrus_id}/weather/{weather_id}",
            put(handlers::model_files::assign_weather_file),
        )
        .route(
            "/api/v1/projects/{id}/hydrus/{hydrus_id}/weather",
            delete(handlers::model_files::unassign_weather_file),
        )
        // Shape routes
        .route(
            "/api/v1/projects/{id}/shapes",
            get(handlers::shapes::get_all_shapes).delete(handlers::shapes::wipe_all_shapes),
        )
        .route(
            "/api/v1/projects/{id}/shapes/{shape_id}",
            put(handlers::shapes::upsert_shape).delete(handlers::shapes::delete_shape),
        )
        .route(
            "/api/v1/projects/{id}/shapes/{shape_id}/mapping",
            put(handlers::shapes::map_shape).delete(handlers::shapes::unmap_shape),
        )
        // Model archives and weather files arrive as raw request bodies
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    // Require the shared API key only when one is configured
    if state.requires_auth() {
        api_routes = api_routes.route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));
    }

    // Combine API routes with public routes
    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        // Merge project data routes
        .merge(api_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // The frontend is served from a different origin in every deployment
        .layer(CorsLayer::permissive())
        // Share storage backend with all handlers via State extraction
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Build the storage backend
    let state = state::build_state(&config).await?;
    tracing::info!("Storage backend ready");

    if state.requires_auth() {
        tracing::info!("API key authentication enabled");
    }

    let app = build_router(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
