//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "Submit media URLs, poll job progress and retrieve finished files",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::submit_download,
        crate::api::routes::get_download_status,
        crate::api::routes::get_download_file,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::Status,
        crate::types::ProgressSource,
        crate::types::Progress,
        crate::types::JobSnapshot,
        crate::types::Event,

        // API request/response types from routes
        crate::api::routes::SubmitDownloadRequest,
        crate::api::routes::SubmitDownloadResponse,

        // Error types from error.rs
        crate::error::ApiError,
    )),
    tags(
        (name = "downloads", description = "Job submission, status polling and file retrieval"),
        (name = "system", description = "Health, events and API documentation")
    )
)]
pub struct ApiDoc;
