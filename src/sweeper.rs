//! Time-based eviction of stored artifacts
//!
//! The sweeper acts purely on filesystem state. Each pass lists the storage
//! directory, deletes every regular file whose modification time is older than
//! the retention window and evicts the registry record mapped to that path.
//! A failure on one entry is logged and the pass moves on.
//!
//! # Example
//!
//! ```no_run
//! use media_dl::{Config, MediaDownloader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = MediaDownloader::new(Config::default()).await?;
//!
//! // Passes run every `storage.sweep_interval` until shutdown
//! let handle = downloader.start_sweeper();
//! # drop(handle);
//! # Ok(())
//! # }
//! ```

use crate::registry::JobRegistry;
use crate::storage::Storage;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one sweep pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files inspected
    pub scanned: usize,
    /// Files deleted for exceeding the retention window
    pub removed: usize,
    /// Registry records evicted alongside a deleted file
    pub evicted: usize,
    /// Entries that could not be inspected or deleted
    pub failed: usize,
}

/// Periodic artifact expiry task
pub struct ExpirySweeper {
    registry: Arc<JobRegistry>,
    storage: Storage,
    retention: Duration,
    interval: Duration,
}

impl ExpirySweeper {
    /// Creates a new sweeper
    pub fn new(
        registry: Arc<JobRegistry>,
        storage: Storage,
        retention: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            storage,
            retention,
            interval,
        }
    }

    /// Run passes every `interval` until `shutdown` fires
    ///
    /// The first pass happens one interval after start.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            retention_secs = self.retention.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Expiry sweeper started"
        );

        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep_once().await;
                    if report.removed > 0 || report.failed > 0 {
                        info!(
                            scanned = report.scanned,
                            removed = report.removed,
                            evicted = report.evicted,
                            failed = report.failed,
                            "Sweep pass complete"
                        );
                    } else {
                        debug!(scanned = report.scanned, "Sweep pass found nothing to remove");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Expiry sweeper shutting down");
                    break;
                }
            }
        }
    }

    /// Run a single pass against the current time
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// Run a single pass treating `now` as the current time
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let mut entries = match tokio::fs::read_dir(self.storage.root()).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    path = %self.storage.root().display(),
                    error = %e,
                    "Failed to list storage directory"
                );
                report.failed += 1;
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Failed to read storage directory entry");
                    report.failed += 1;
                    break;
                }
            };
            let path = entry.path();

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to stat artifact");
                    report.failed += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            report.scanned += 1;

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read modification time");
                    report.failed += 1;
                    continue;
                }
            };

            // Files stamped in the future have age zero
            let age = now.duration_since(modified).unwrap_or_default();
            if age <= self.retention {
                continue;
            }

            match self.storage.remove(&path).await {
                Ok(true) => {
                    report.removed += 1;
                    debug!(path = %path.display(), age_secs = age.as_secs(), "Removed expired artifact");
                }
                Ok(false) => {
                    debug!(path = %path.display(), "Artifact vanished before removal");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove expired artifact");
                    report.failed += 1;
                    continue;
                }
            }

            if let Some(id) = self.registry.evict_by_path(&path).await {
                report.evicted += 1;
                info!(job_id = %id, "Evicted expired download");
            }
        }

        report
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::JobUpdate;
    use crate::types::{Event, JobId};
    use tokio::sync::broadcast;

    const RETENTION: Duration = Duration::from_secs(30 * 60);

    fn setup() -> (
        tempfile::TempDir,
        Storage,
        Arc<JobRegistry>,
        broadcast::Receiver<Event>,
    ) {
        let temp = tempfile::tempdir().unwrap();
        let storage = Storage::new(temp.path());
        let (event_tx, event_rx) = broadcast::channel(64);
        let registry = Arc::new(JobRegistry::new(storage.clone(), event_tx));
        (temp, storage, registry, event_rx)
    }

    fn sweeper(registry: &Arc<JobRegistry>, storage: &Storage) -> ExpirySweeper {
        ExpirySweeper::new(
            registry.clone(),
            storage.clone(),
            RETENTION,
            Duration::from_secs(300),
        )
    }

    fn write_with_age(path: &std::path::Path, age: Duration) {
        std::fs::write(path, b"media bytes").unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    async fn ready_job(registry: &JobRegistry) -> JobId {
        let id = registry.create("https://example.com").await;
        registry.update(id, JobUpdate::Processing).await;
        registry
            .update(
                id,
                JobUpdate::Ready {
                    filename: "clip.mp4".into(),
                },
            )
            .await;
        id
    }

    #[tokio::test]
    async fn aged_artifact_is_removed_and_record_evicted() {
        let (_temp, storage, registry, _events) = setup();
        let old = ready_job(&registry).await;
        let young = ready_job(&registry).await;
        write_with_age(&storage.path_for(old), Duration::from_secs(31 * 60));
        write_with_age(&storage.path_for(young), Duration::from_secs(60));

        let report = sweeper(&registry, &storage).sweep_once().await;

        assert_eq!(
            report,
            SweepReport {
                scanned: 2,
                removed: 1,
                evicted: 1,
                failed: 0
            }
        );
        assert!(!storage.path_for(old).exists());
        assert!(registry.get(old).await.is_none());
        assert!(storage.path_for(young).exists());
        assert!(registry.get(young).await.is_some());
    }

    #[tokio::test]
    async fn orphaned_file_is_removed_without_eviction() {
        let (_temp, storage, registry, _events) = setup();
        let orphan = storage.path_for(JobId::new());
        write_with_age(&orphan, Duration::from_secs(2 * 60 * 60));

        let report = sweeper(&registry, &storage).sweep_once().await;

        assert_eq!(report.removed, 1);
        assert_eq!(report.evicted, 0);
        assert!(!orphan.exists());
    }

    #[tokio::test]
    async fn age_is_measured_against_supplied_clock() {
        let (_temp, storage, registry, _events) = setup();
        let id = ready_job(&registry).await;
        std::fs::write(storage.path_for(id), b"fresh").unwrap();

        let sweeper = sweeper(&registry, &storage);
        assert_eq!(sweeper.sweep_once().await.removed, 0);

        let later = SystemTime::now() + RETENTION + Duration::from_secs(1);
        let report = sweeper.sweep_at(later).await;
        assert_eq!(report.removed, 1);
        assert_eq!(report.evicted, 1);
    }

    #[tokio::test]
    async fn directories_are_skipped() {
        let (temp, storage, registry, _events) = setup();
        std::fs::create_dir(temp.path().join("nested")).unwrap();

        let later = SystemTime::now() + Duration::from_secs(24 * 60 * 60);
        let report = sweeper(&registry, &storage).sweep_at(later).await;

        assert_eq!(report, SweepReport::default());
        assert!(temp.path().join("nested").is_dir());
    }

    #[tokio::test]
    async fn missing_storage_directory_is_reported_not_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let storage = Storage::new(temp.path().join("does-not-exist"));
        let (event_tx, _rx) = broadcast::channel(8);
        let registry = Arc::new(JobRegistry::new(storage.clone(), event_tx));

        let report = sweeper(&registry, &storage).sweep_once().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.scanned, 0);
    }

    #[tokio::test]
    async fn eviction_publishes_event() {
        let (_temp, storage, registry, mut events) = setup();
        let id = ready_job(&registry).await;
        write_with_age(&storage.path_for(id), Duration::from_secs(60 * 60));
        while events.try_recv().is_ok() {}

        sweeper(&registry, &storage).sweep_once().await;

        assert!(matches!(events.try_recv().unwrap(), Event::Evicted { id: e } if e == id));
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let (_temp, storage, registry, _events) = setup();
        let token = CancellationToken::new();
        let handle = tokio::spawn(sweeper(&registry, &storage).run(token.clone()));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn run_sweeps_after_first_interval() {
        let (_temp, storage, registry, _events) = setup();
        let id = ready_job(&registry).await;
        write_with_age(&storage.path_for(id), Duration::from_secs(60 * 60));

        let token = CancellationToken::new();
        let sweeper = ExpirySweeper::new(
            registry.clone(),
            storage.clone(),
            RETENTION,
            Duration::from_millis(200),
        );
        let handle = tokio::spawn(sweeper.run(token.clone()));

        // No pass runs at start
        assert!(registry.get(id).await.is_some());

        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if registry.get(id).await.is_none() {
                break;
            }
        }
        assert!(registry.get(id).await.is_none());
        assert!(!storage.path_for(id).exists());

        token.cancel();
        handle.await.unwrap();
    }
}
