//! # media-dl
//!
//! Asynchronous media download orchestration backed by an external resolver.
//!
//! A client submits a source URL and immediately gets a job ID back. In the
//! background the job asks the resolver how to fetch the media, streams the
//! bytes to local storage while reporting progress, and finally exposes the
//! stored file for a one-shot download. Stored files are purged after a
//! retention window by a periodic sweeper.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{MediaDownloader, Config};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let downloader = Arc::new(MediaDownloader::new(config).await?);
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let _sweeper = downloader.start_sweeper();
//!     let _api = downloader.spawn_api_server();
//!
//!     let id = downloader.submit("https://example.com/watch?v=abc").await?;
//!     println!("status: {:?}", downloader.status(id).await?.status);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// In-memory job registry
pub mod registry;
/// Upstream resolver client
pub mod resolver;
/// Artifact storage layout
pub mod storage;
/// Time-based artifact expiry
pub mod sweeper;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use downloader::MediaDownloader;
pub use error::{
    AcquireError, ApiError, Error, JobError, ResolverError, Result, ToHttpStatus,
};
pub use registry::{JobRegistry, JobUpdate};
pub use resolver::{AcquisitionPlan, PlanKind, ResolverClient};
pub use storage::Storage;
pub use sweeper::{ExpirySweeper, SweepReport};
pub use types::{
    Event, Job, JobId, JobSnapshot, JobState, Progress, ProgressSource, ReadyFile, Status,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method,
/// which also stops the sweeper and any API server started from this downloader.
/// Returns early if the downloader is shut down by other means.
///
/// - **Unix:** listens for SIGTERM and SIGINT, falling back to `ctrl_c()` if neither registers.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{MediaDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::new(Config::from_env()?).await?;
///     let _sweeper = downloader.start_sweeper();
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    let stopped = downloader.queue_state.shutdown.clone();

    tokio::select! {
        signal = wait_for_signal() => {
            tracing::info!(signal, "Termination signal received, shutting down");
        }
        // Something else already called shutdown()
        _ = stopped.cancelled() => return Ok(()),
    }

    downloader.shutdown().await
}

/// Resolve with the name of the first termination signal
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    // Registration can fail in restricted environments; a missing stream never fires
    let register = |kind: SignalKind, name: &'static str| match signal(kind) {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::warn!(signal = name, error = %e, "Could not register signal handler");
            None
        }
    };

    async fn next(stream: &mut Option<Signal>) {
        match stream {
            Some(stream) => {
                stream.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    let mut sigterm = register(SignalKind::terminate(), "SIGTERM");
    let mut sigint = register(SignalKind::interrupt(), "SIGINT");

    if sigterm.is_none() && sigint.is_none() {
        tracing::error!("No signal handlers registered, falling back to ctrl_c");
        let _ = tokio::signal::ctrl_c().await;
        return "ctrl_c";
    }

    tokio::select! {
        _ = next(&mut sigterm) => "SIGTERM",
        _ = next(&mut sigint) => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    "ctrl_c"
}
