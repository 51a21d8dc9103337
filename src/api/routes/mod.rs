//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] - Job submission, status polling and file retrieval
//! - [`system`] - Health, events, OpenAPI

use crate::types::JobId;
use serde::{Deserialize, Serialize};

mod downloads;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use downloads::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitDownloadRequest {
    /// Source URL to fetch media from (http or https)
    #[serde(default)]
    pub url: Option<String>,
}

/// Response body for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDownloadResponse {
    /// Identifier to poll status and fetch the file with
    pub download_id: JobId,
    /// Human-readable acknowledgement
    pub message: String,
}
