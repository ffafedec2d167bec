//! Job submission and inspection handlers.

use crate::api::AppState;
use crate::error::Error;
use crate::types::{JobId, JobRequest, SubmitResponse};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// POST /jobs - Submit a new job
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "jobs",
    request_body = JobRequest,
    responses(
        (status = 202, description = "Job accepted, pipeline running", body = SubmitResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<impl IntoResponse, Error> {
    let job_id = state.manager.submit(request).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id })))
}

/// GET /jobs - All status records, newest-updated first
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "All job status records"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let records = state.manager.get_all_status().await?;
    Ok(Json(records))
}

/// GET /jobs/{id} - One job's status record
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job status record"),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let id = JobId::from(id);
    match state.manager.get_status(&id).await {
        Some(record) => Ok(Json(record)),
        None => Err(Error::NotFound(format!("job {id}"))),
    }
}

/// GET /jobs/{id}/log - The job's raw log transcript
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/log",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Log transcript (text/plain)", content_type = "text/plain"),
        (status = 404, description = "Job has no log", body = crate::error::ApiError)
    )
)]
pub async fn get_job_log(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let id = JobId::from(id);
    match state.manager.read_log(&id).await {
        Some(text) => Ok(text),
        None => Err(Error::NotFound(format!("log for job {id}"))),
    }
}
