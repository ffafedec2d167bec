//! Authentication middleware for the REST API
//!
//! Optional API key authentication via the X-Api-Key header. When
//! `ApiConfig::api_key` is set, every request must carry a matching header
//! or it receives a 401 with a structured error body.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::constant_time_eq;
use crate::error::ApiError;

/// Middleware checking X-Api-Key against the configured key.
///
/// With no key configured all requests pass through. Comparison is
/// constant-time; header values that are not valid UTF-8 count as absent.
pub async fn require_api_key(
    State(expected_api_key): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_key) = expected_api_key else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if constant_time_eq(key.as_bytes(), expected_key.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => unauthorized("Invalid API key"),
        None => unauthorized("Missing X-Api-Key header"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError::unauthorized(message)),
    )
        .into_response()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
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
    use tower::ServiceExt; // for oneshot

    fn app(api_key: Option<&str>) -> Router {
        Router::new()
            .route("/test", get(|| async { StatusCode::OK }))
            .layer(middleware::from_fn_with_state(
                api_key.map(String::from),
                require_api_key,
            ))
    }

    fn request(key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/test");
        if let Some(key) = key {
            builder = builder.header("X-Api-Key", key);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn no_key_configured_passes_everything() {
        let response = app(None).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn matching_key_passes() {
        let response = app(Some("secret"))
            .oneshot(request(Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_key_is_401_with_error_body() {
        let response = app(Some("secret"))
            .oneshot(request(Some("nope")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "unauthorized");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Invalid API key"));
    }

    #[tokio::test]
    async fn missing_key_is_401() {
        let response = app(Some("secret")).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn comparison_is_exact() {
        // case differences and whitespace both fail
        for wrong in ["SECRET", "secret ", " secret"] {
            let response = app(Some("secret"))
                .oneshot(request(Some(wrong)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
