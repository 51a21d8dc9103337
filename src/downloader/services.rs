//! Background service starters: expiry sweeper and API server.

use crate::error::Result;
use std::sync::Arc;

use super::MediaDownloader;

impl MediaDownloader {
    /// Start the expiry sweeper background task
    ///
    /// The sweeper runs every `storage.sweep_interval` and stops when
    /// [`shutdown`](Self::shutdown) is called.
    pub fn start_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let sweeper = self.sweeper();
        let shutdown = self.queue_state.shutdown.clone();

        let handle = tokio::spawn(async move {
            sweeper.run(shutdown).await;
        });

        tracing::info!("Expiry sweeper background task started");

        handle
    }

    /// Spawn the API server in a background task
    ///
    /// The server stops accepting connections once shutdown begins.
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
