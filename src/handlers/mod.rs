//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, raw bytes)
//! 2. Delegates to the project service
//! 3. Returns HTTP response (JSON, status code, archive download)

/// Service health endpoint
pub mod health;
/// Hydrus / Modflow / weather file endpoints
pub mod model_files;
/// Project lifecycle endpoints
pub mod projects;
/// Shape mask and mapping endpoints
pub mod shapes;
