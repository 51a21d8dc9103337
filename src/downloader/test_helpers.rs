//! Shared test helpers for creating MediaDownloader instances in tests.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::types::{JobId, JobSnapshot};
use std::time::Duration;
use tempfile::tempdir;

/// Build a test config pointing at `resolver_url` with storage in `dir`
pub(crate) fn test_config(resolver_url: &str, dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.resolver.base_url = resolver_url.to_string();
    config.storage.storage_dir = dir.join("media");
    config.download.max_concurrent_jobs = 3;
    config.download.estimate_interval = Duration::from_millis(10);
    config
}

/// Helper to create a test MediaDownloader talking to `resolver_url`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    resolver_url: &str,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(resolver_url, temp_dir.path());
    let downloader = MediaDownloader::new(config).await.unwrap();
    (downloader, temp_dir)
}

/// Poll a job until it reaches `ready` or `error`
pub(crate) async fn wait_for_terminal(downloader: &MediaDownloader, id: JobId) -> JobSnapshot {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let snapshot = downloader.status(id).await.unwrap();
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not reach a terminal state")
}
