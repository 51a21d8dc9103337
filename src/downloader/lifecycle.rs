//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::MediaDownloader;

/// How long shutdown waits for in-flight jobs
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl MediaDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Stops background services (the expiry sweeper)
    /// 3. Waits for in-flight jobs to finish, up to 30 seconds
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Jobs still running after the timeout are left to the runtime; nothing is
    /// persisted, so their records are lost with the process.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new downloads
        self.queue_state
            .accepting_new
            .store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new downloads");

        // 2. Stop background services
        self.queue_state.shutdown.cancel();

        // 3. Wait for in-flight jobs with timeout
        self.queue_state.tracker.close();
        let in_flight = self.queue_state.tracker.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for in-flight downloads to complete");
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.queue_state.tracker.wait()).await {
            Ok(()) => tracing::info!("All in-flight downloads completed"),
            Err(_) => tracing::warn!(
                remaining = self.queue_state.tracker.len(),
                "Timeout waiting for downloads to complete, proceeding with shutdown"
            ),
        }

        // 4. Emit shutdown event
        self.event_tx.send(Event::Shutdown).ok();

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        !self.queue_state.accepting_new.load(Ordering::SeqCst)
    }
}
