//! API key authentication middleware.
//!
//! The service is single-tenant (HMSE-frontend is the only consumer), so
//! authentication is one shared key: the middleware hashes the presented
//! bearer token with SHA-256 and compares it against the hash of the
//! configured key. It is only mounted when an `API_KEY` is configured.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::{error::AppError, state::AppState};

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Hash the `<key>` using SHA-256
/// 3. Compare against the hash of the configured key
/// 4. If equal: call next handler
/// 5. Otherwise: return 401 Unauthorized error
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer abc123xyz
/// ```
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Middleware is only mounted when a key is configured.
    let Some(expected_hash) = state.api_key_hash.as_deref() else {
        return Ok(next.run(request).await);
    };

    // Step 1: Extract Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    // Step 2: Extract Bearer token
    // Expected format: "Bearer <api_key>"
    let api_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidApiKey)?;

    // Step 3: Hash the API key using SHA-256
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    let key_hash = hex::encode(hasher.finalize());

    // Step 4: Compare against the configured key's hash
    if key_hash != expected_hash {
        return Err(AppError::InvalidApiKey);
    }

    // Step 5: Call the next middleware/handler
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::dao::fs::FsProjectDao;

    async fn protected_router(tmp: &TempDir, api_key: Option<&str>) -> Router {
        let state = AppState {
            dao: Arc::new(
                FsProjectDao::new(tmp.path().join("workspace"))
                    .await
                    .unwrap(),
            ),
            api_key_hash: api_key.map(|key| hex::encode(Sha256::digest(key.as_bytes()))),
        };
        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn status_for(router: Router, authorization: Option<&str>) -> StatusCode {
        let mut request = Request::builder().uri("/protected");
        if let Some(value) = authorization {
            request = request.header("Authorization", value);
        }
        let response = router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn missing_or_wrong_key_is_unauthorized() {
        let tmp = TempDir::new().unwrap();
        let router = protected_router(&tmp, Some("letmein")).await;

        assert_eq!(
            status_for(router.clone(), None).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(router.clone(), Some("Bearer wrong")).await,
            StatusCode::UNAUTHORIZED
        );
        // A bare key without the Bearer scheme is rejected too.
        assert_eq!(
            status_for(router, Some("letmein")).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn correct_key_passes_through() {
        let tmp = TempDir::new().unwrap();
        let router = protected_router(&tmp, Some("letmein")).await;
        assert_eq!(
            status_for(router, Some("Bearer letmein")).await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn requests_pass_when_no_key_is_configured() {
        let tmp = TempDir::new().unwrap();
        let router = protected_router(&tmp, None).await;
        assert_eq!(status_for(router, None).await, StatusCode::OK);
    }
}
