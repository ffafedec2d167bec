//! OpenAPI documentation and schema generation
//!
//! Compile-time OpenAPI spec for the webdl REST API, served at
//! `/api/v1/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the webdl REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "webdl REST API",
        version = "0.1.0",
        description = "REST API for submitting and observing download-compress-upload jobs",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6789/api/v1", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::submit_job,
        crate::api::routes::list_jobs,
        crate::api::routes::get_job,
        crate::api::routes::get_job_log,

        // System
        crate::api::routes::health_check,
        crate::api::routes::system_status,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::JobRequest,
        crate::types::JobSpec,
        crate::types::DownloaderKind,
        crate::types::UploadBackend,
        crate::types::CompressionOptions,
        crate::types::ProxyMode,
        crate::types::JobState,
        crate::types::Event,
        crate::types::SubmitResponse,

        // Config types from config.rs
        crate::config::Config,
        crate::config::StorageConfig,
        crate::config::ToolsConfig,
        crate::config::ProxyConfig,
        crate::config::ApiConfig,

        // System metrics
        crate::system::SystemStatus,
        crate::system::UsageStats,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Job pipeline - Submit URLs and observe status records and logs"),
        (name = "system", description = "System endpoints - Health checks, host metrics, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon to add API key authentication scheme to OpenAPI spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
