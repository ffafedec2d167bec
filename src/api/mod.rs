//! REST API server module
//!
//! Exposes the job pipeline over HTTP: submission, status polling, log
//! retrieval, host metrics, and a server-sent event stream, all versioned
//! under `/api/v1`.

use crate::{Config, JobManager, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes (under /api/v1)
///
/// ## Jobs
/// - `POST /jobs` - Submit a job (202 + job id)
/// - `GET /jobs` - List all status records, newest first
/// - `GET /jobs/{id}` - Get one status record
/// - `GET /jobs/{id}/log` - Get the raw log transcript
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /status` - Host CPU/memory/disk metrics
/// - `GET /events` - Server-sent events stream
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(manager: JobManager, config: Arc<Config>) -> Router {
    let state = AppState::new(manager, config.clone());

    let api = Router::new()
        // Jobs
        .route("/jobs", post(routes::submit_job))
        .route("/jobs", get(routes::list_jobs))
        .route("/jobs/:id", get(routes::get_job))
        .route("/jobs/:id/log", get(routes::get_job_log))
        // System
        .route("/health", get(routes::health_check))
        .route("/status", get(routes::system_status))
        .route("/events", get(routes::event_stream))
        .route("/openapi.json", get(routes::openapi_spec));

    let router = Router::new().nest("/api/v1", api).with_state(state);

    // Auth is applied outside the nest so every versioned route is covered.
    let router = if config.api.api_key.is_some() {
        router.layer(middleware::from_fn_with_state(
            config.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        router
    };

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// CORS layer for the configured origins ("*" or empty list allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Binds a TCP listener and serves the router until shutdown. Usually
/// spawned through [`JobManager::spawn_api_server`].
pub async fn start_api_server(manager: JobManager, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    let app = create_router(manager, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServer(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}
