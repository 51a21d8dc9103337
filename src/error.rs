//! Error types for media-dl
//!
//! This module provides:
//! - Domain-specific error types (job lookups, resolver protocol, acquisition)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes
//! - The failure reason recorded on a job when its processing task fails

use crate::types::{JobId, Status};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Reason recorded when the resolver answers with a shape we cannot act on
pub const UNSUPPORTED_RESPONSE_REASON: &str = "Unsupported response from resolver";

/// Reason recorded when writing the artifact to disk fails
pub const FILE_WRITE_REASON: &str = "File write error";

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "FILE_EXPIRY_MINUTES")
        key: Option<String>,
    },

    /// Submission rejected before a job was created
    #[error("validation error: {0}")]
    Validation(String),

    /// Job lookup or state error
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// Upstream resolver failure
    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Media transfer failure
    #[error("acquisition error: {0}")]
    Acquire(#[from] AcquireError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found (unparseable identifiers and similar)
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Job lookup and state errors surfaced by the façade
#[derive(Debug, Error)]
pub enum JobError {
    /// No job with this ID in the registry
    #[error("download {id} not found")]
    NotFound {
        /// The job ID that was not found
        id: JobId,
    },

    /// The job exists but is not ready to be served
    #[error("download {id} is not ready (status: {status})")]
    NotReady {
        /// The job ID
        id: JobId,
        /// Its current status
        status: Status,
    },

    /// The job is ready but its artifact is gone from disk
    #[error("file for download {id} is missing from storage")]
    FileMissing {
        /// The job ID
        id: JobId,
        /// Where the artifact was expected
        path: PathBuf,
    },
}

/// Errors produced while talking to the upstream resolver
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The resolver reported a failure code
    #[error("resolver reported error code {code}")]
    Upstream {
        /// Resolver-defined error code
        code: String,
    },

    /// The resolver answered with a status we do not handle
    #[error("unsupported resolver response (status: {})", .status.as_deref().unwrap_or("none"))]
    Unsupported {
        /// The `status` field of the response, if present
        status: Option<String>,
    },

    /// The resolver returned a picker with no candidates
    #[error("resolver returned an empty picker")]
    EmptyPicker,

    /// The resolver answered with a non-success HTTP status and no error body
    #[error("resolver returned HTTP {status}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
    },

    /// The request to the resolver could not be completed
    #[error("{0}")]
    Transport(String),
}

impl ResolverError {
    /// Reason recorded on the failed job
    pub fn failure_reason(&self) -> String {
        match self {
            ResolverError::Upstream { code } => code.clone(),
            ResolverError::Unsupported { .. } | ResolverError::EmptyPicker => {
                UNSUPPORTED_RESPONSE_REASON.to_string()
            }
            ResolverError::HttpStatus { .. } | ResolverError::Transport(_) => self.to_string(),
        }
    }
}

/// Errors produced while streaming media bytes to disk
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The media request or body stream failed
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// The media server answered with a non-success status
    #[error("media server returned HTTP {status}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
    },

    /// Writing the artifact failed
    #[error("failed to write artifact: {0}")]
    Write(#[source] std::io::Error),
}

impl AcquireError {
    /// Reason recorded on the failed job
    pub fn failure_reason(&self) -> String {
        match self {
            AcquireError::Write(_) => FILE_WRITE_REASON.to_string(),
            AcquireError::Request(_) | AcquireError::HttpStatus { .. } => self.to_string(),
        }
    }
}

impl Error {
    /// Reason recorded on a job whose processing task returned this error
    pub fn failure_reason(&self) -> String {
        match self {
            Error::Resolver(e) => e.failure_reason(),
            Error::Acquire(e) => e.failure_reason(),
            Error::Io(_) => FILE_WRITE_REASON.to_string(),
            other => other.to_string(),
        }
    }
}

/// API error response format
///
/// `error` is always a plain string so clients can render it directly; the
/// machine-readable code and any structured context sit beside it.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": "job error: download 4d0b… not found",
///   "code": "download_not_found",
///   "details": {
///     "download_id": "4d0b…"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable error code (e.g., "download_not_found", "validation_error")
    pub code: String,

    /// Optional additional context about the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            details: Some(details),
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
            // 400 Bad Request - Client error (invalid input or wrong state)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,
            Error::Job(JobError::NotReady { .. }) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Job(JobError::NotFound { .. }) => 404,
            Error::Job(JobError::FileMissing { .. }) => 404,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Acquire(AcquireError::Write(_)) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Resolver(_) => 502,
            Error::Acquire(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Job(e) => match e {
                JobError::NotFound { .. } => "download_not_found",
                JobError::NotReady { .. } => "download_not_ready",
                JobError::FileMissing { .. } => "file_not_found",
            },
            Error::Resolver(e) => match e {
                ResolverError::Upstream { .. } => "resolver_error",
                ResolverError::Unsupported { .. } => "unsupported_response",
                ResolverError::EmptyPicker => "empty_picker",
                ResolverError::HttpStatus { .. } => "resolver_http_error",
                ResolverError::Transport(_) => "resolver_unreachable",
            },
            Error::Acquire(e) => match e {
                AcquireError::Request(_) => "transfer_error",
                AcquireError::HttpStatus { .. } => "media_http_error",
                AcquireError::Write(_) => "file_write_error",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Job(JobError::NotFound { id }) => Some(serde_json::json!({
                "download_id": id,
            })),
            Error::Job(JobError::NotReady { id, status }) => Some(serde_json::json!({
                "download_id": id,
                "status": status,
            })),
            Error::Job(JobError::FileMissing { id, .. }) => Some(serde_json::json!({
                "download_id": id,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: message,
            code,
            details,
        }
    }
}
