//! Error types for webdl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Process, Config, Network, etc.)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for webdl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for webdl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration or job-submission validation error
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the invalid setting
        message: String,
        /// The configuration or request key that caused the error (e.g., "upload_service")
        key: Option<String>,
    },

    /// External tool execution failed (downloader, compressor, rclone)
    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    /// Network error (proxy-list fetch or probe)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (status store, log file, working directories)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Job not found
    #[error("job not found: {0}")]
    NotFound(String),

    /// API server error
    #[error("API server error: {0}")]
    ApiServer(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a validation error tied to a request key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// External-process errors raised by the process runner
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The process could not be launched at all
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        /// The rendered command line that failed to start
        command: String,
        /// The underlying launch error
        #[source]
        source: std::io::Error,
    },

    /// The process started but exited with a non-zero status
    #[error("`{command}` failed with exit code {}", .code.map_or_else(|| "unknown (killed by signal)".to_string(), |c| c.to_string()))]
    ExitCode {
        /// The rendered command line that failed
        command: String,
        /// The exit code, or None if terminated by a signal
        code: Option<i32>,
    },

    /// The process ran past the configured stage timeout and was killed
    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut {
        /// The rendered command line that hung
        command: String,
        /// The timeout that elapsed
        timeout: Duration,
    },
}

/// API error response format
///
/// Returned by API endpoints when an error occurs: a machine-readable code,
/// a human-readable message, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "job 9a1f... not found"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - client error (invalid submission or config)
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 502 Bad Gateway - upstream network failure
            Error::Network(_) => 502,

            // 503 Service Unavailable - external tool problems
            Error::Process(_) => 503,

            // 500 Internal Server Error - server-side issues
            Error::Serialization(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServer(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "validation_error",
            Error::Process(e) => match e {
                ProcessError::Spawn { .. } => "launch_failed",
                ProcessError::ExitCode { .. } => "process_failed",
                ProcessError::TimedOut { .. } => "process_timeout",
            },
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ApiServer(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Process(ProcessError::ExitCode { command, code }) => Some(serde_json::json!({
                "command": command,
                "exit_code": code,
            })),
            Error::Process(ProcessError::TimedOut { command, timeout }) => {
                Some(serde_json::json!({
                    "command": command,
                    "timeout_secs": timeout.as_secs(),
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns (Error, expected status code, expected error code) for every
    /// reachable match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("upload_service".into()),
                },
                400,
                "validation_error",
            ),
            (Error::NotFound("job 42".into()), 404, "not_found"),
            (
                Error::Process(ProcessError::Spawn {
                    command: "gallery-dl".into(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                }),
                503,
                "launch_failed",
            ),
            (
                Error::Process(ProcessError::ExitCode {
                    command: "rclone copyto".into(),
                    code: Some(1),
                }),
                503,
                "process_failed",
            ),
            (
                Error::Process(ProcessError::TimedOut {
                    command: "megadl".into(),
                    timeout: Duration::from_secs(30),
                }),
                503,
                "process_timeout",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::ApiServer("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::Other("unknown".into()), 500, "internal_error"),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_status = error.status_code();
            assert_eq!(
                actual_status, expected_status,
                "variant with error_code={expected_code} returned status {actual_status}, expected {expected_status}"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_code = error.error_code();
            assert_eq!(
                actual_code, expected_code,
                "variant with expected status={expected_status} returned error_code={actual_code}, expected {expected_code}"
            );
        }
    }

    #[test]
    fn exit_code_display_includes_code() {
        let err = ProcessError::ExitCode {
            command: "gallery-dl --verbose".into(),
            code: Some(2),
        };
        let msg = err.to_string();
        assert!(msg.contains("gallery-dl --verbose"));
        assert!(msg.contains("exit code 2"));
    }

    #[test]
    fn exit_code_display_handles_signal_termination() {
        let err = ProcessError::ExitCode {
            command: "megadl".into(),
            code: None,
        };
        assert!(err.to_string().contains("unknown (killed by signal)"));
    }

    #[test]
    fn api_error_from_exit_code_has_command_and_code() {
        let err = Error::Process(ProcessError::ExitCode {
            command: "rclone copyto".into(),
            code: Some(1),
        });
        let api: ApiError = err.into();

        assert_eq!(api.error.code, "process_failed");
        let details = api.error.details.expect("should have details");
        assert_eq!(details["command"], "rclone copyto");
        assert_eq!(details["exit_code"], 1);
    }

    #[test]
    fn api_error_from_config_has_key_detail() {
        let err = Error::config("unsupported backend", "upload_service");
        let api: ApiError = err.into();

        assert_eq!(api.error.code, "validation_error");
        let details = api.error.details.expect("should have details");
        assert_eq!(details["key"], "upload_service");
    }

    #[test]
    fn api_error_from_io_has_no_details() {
        let err = Error::Io(std::io::Error::other("disk fail"));
        let api: ApiError = err.into();

        assert_eq!(api.error.code, "io_error");
        assert!(api.error.details.is_none());
    }

    #[test]
    fn api_error_message_matches_error_display() {
        let err = Error::NotFound("job abc".into());
        let display_msg = err.to_string();
        let api: ApiError = err.into();

        assert_eq!(api.error.message, display_msg);
    }

    #[test]
    fn api_error_without_details_omits_details_in_json() {
        let api = ApiError::not_found("job 42");

        let json_str = serde_json::to_string(&api).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json_str).unwrap();

        assert_eq!(parsed["error"]["code"], "not_found");
        assert!(
            parsed["error"].get("details").is_none(),
            "details field should be omitted from JSON when None"
        );
    }

    #[test]
    fn api_error_validation_factory() {
        let api = ApiError::validation("url is required");

        assert_eq!(api.error.code, "validation_error");
        assert_eq!(api.error.message, "url is required");
        assert!(api.error.details.is_none());
    }
}
