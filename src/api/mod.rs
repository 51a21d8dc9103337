//! REST API server module
//!
//! Provides the HTTP surface of the downloader: job submission, status
//! polling, file retrieval and a server-sent event stream, described by an
//! OpenAPI 3.1 document.

use crate::{Config, MediaDownloader, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Downloads
/// - `POST /download` - Submit a source URL, returns `202` with the job ID
/// - `GET /download/:id/status` - Poll a job's status and progress
/// - `GET /download/:id/file` - Stream the finished artifact
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(downloader: Arc<MediaDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let router = Router::new()
        // Downloads
        .route("/download", post(routes::submit_download))
        .route("/download/:id/status", get(routes::get_download_status))
        .route("/download/:id/file", get(routes::get_download_file))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    // Add state to all routes
    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are permitted.
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
/// Runs until the downloader begins shutting down, then stops accepting
/// connections and drains the open ones.
///
/// # Example
///
/// ```no_run
/// use media_dl::{MediaDownloader, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(MediaDownloader::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// media_dl::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(downloader: Arc<MediaDownloader>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve(listener, downloader, config).await
}

/// Serve the API on an already-bound listener
///
/// Useful when the caller needs the actual address (e.g. when binding port 0).
pub async fn serve(
    listener: TcpListener,
    downloader: Arc<MediaDownloader>,
    config: Arc<Config>,
) -> Result<()> {
    let shutdown = downloader.queue_state.shutdown.clone();
    let app = create_router(downloader, config);

    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
