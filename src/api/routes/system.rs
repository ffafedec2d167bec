//! System handlers: health, host status, OpenAPI, events.

use crate::api::AppState;
use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let active = state.manager.active_count().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_jobs": active
    }))
}

/// GET /status - Host metrics
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "system",
    responses(
        (status = 200, description = "CPU, memory, and disk usage", body = crate::system::SystemStatus)
    )
)]
pub async fn system_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.monitor.snapshot())
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/api/v1/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET /events - Server-sent events stream of job lifecycle events
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = state.manager.subscribe();
    let stream = BroadcastStream::new(receiver);

    let sse_stream = stream.filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json_data) => {
                let event_type = match &event {
                    crate::types::Event::JobQueued { .. } => "job_queued",
                    crate::types::Event::StageStarted { .. } => "stage_started",
                    crate::types::Event::JobCompleted { .. } => "job_completed",
                    crate::types::Event::JobFailed { .. } => "job_failed",
                    crate::types::Event::ProxySelected { .. } => "proxy_selected",
                };
                Some(Ok(SseEvent::default().event(event_type).data(json_data)))
            }
            Err(_) => None,
        },
        // Lagged receivers drop the missed events and continue.
        Err(_) => None,
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}
