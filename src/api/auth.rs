//! Shared-secret authentication middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::{error::ApiError, state::AppState, utils::presented_api_key};

/// Rejects requests whose `x-api-key` header (or `api_key` query parameter)
/// does not exactly match the configured key.
///
/// Runs before any handler, so a rejected request never touches the store.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = presented_api_key(req.headers(), req.uri());

    if presented.as_deref() != Some(state.config.server.api_key.as_str()) {
        warn!(
            method = %req.method(),
            path = %req.uri().path(),
            key_present = presented.is_some(),
            "Rejected request with invalid API key"
        );
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::ledger::TransactionStore;

    fn app() -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            TransactionStore::open(temp_dir.path().join("auth.db"), 1, Duration::from_secs(1))
                .unwrap();
        let state = AppState::new(Config::default().with_api_key("secret"), store);

        let router = Router::new()
            .route("/protected", get(|| async { "ok" }))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
            .with_state(state);
        (router, temp_dir)
    }

    async fn status_for(request: Request<Body>) -> StatusCode {
        let (app, _temp) = app();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_valid_header_passes() {
        let request = Request::get("/protected")
            .header("x-api-key", "secret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_for(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_valid_query_passes() {
        let request = Request::get("/protected?api_key=secret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_for(request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_key_rejected() {
        let request = Request::get("/protected")
            .header("x-api-key", "Secret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_for(request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_key_rejected() {
        let request = Request::get("/protected").body(Body::empty()).unwrap();
        assert_eq!(status_for(request).await, StatusCode::UNAUTHORIZED);
    }
}
