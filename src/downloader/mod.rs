//! Core downloader implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by concern:
//! - [`pipeline`] - Supervised job spawning and the resolve/acquire sequence
//! - [`acquire`] - Streaming media bytes to disk
//! - [`progress`] - Synthetic progress when the total size is unknown
//! - [`lifecycle`] - Shutdown coordination
//! - [`services`] - Background service starters (sweeper, API server)

mod acquire;
mod lifecycle;
mod pipeline;
mod progress;
mod services;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{Error, JobError, Result};
use crate::registry::JobRegistry;
use crate::resolver::{DEFAULT_FILENAME, ResolverClient};
use crate::storage::Storage;
use crate::sweeper::{ExpirySweeper, SweepReport};
use crate::types::{Event, JobId, JobSnapshot, JobState, ReadyFile};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Job scheduling and shutdown state
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Supervised pool every job task (and its supervisor) is spawned onto
    pub(crate) tracker: TaskTracker,
    /// Semaphore bounding jobs that are resolving or transferring at once
    pub(crate) admission: Arc<Semaphore>,
    /// Flag to indicate whether new submissions are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled on shutdown to stop background services
    pub(crate) shutdown: CancellationToken,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped or cheap to clone)
#[derive(Clone)]
pub struct MediaDownloader {
    /// In-memory job registry
    pub(crate) registry: Arc<JobRegistry>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// HTTP client used for media transfers
    pub(crate) http: reqwest::Client,
    /// Upstream resolver client
    pub(crate) resolver: ResolverClient,
    /// Artifact path mapping
    pub(crate) storage: Storage,
    /// Job scheduling and shutdown state
    pub(crate) queue_state: QueueState,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// Validates the configuration, creates the storage directory and sets up
    /// the HTTP client and event channel. No background task is started; call
    /// [`start_sweeper`](Self::start_sweeper) to enable expiry.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = Storage::new(config.storage.storage_dir.clone());
        storage.ensure_root().await?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("media-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let resolver = ResolverClient::new(http.clone(), &config.resolver)?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let registry = Arc::new(JobRegistry::new(storage.clone(), event_tx.clone()));

        let queue_state = QueueState {
            tracker: TaskTracker::new(),
            admission: Arc::new(Semaphore::new(config.download.max_concurrent_jobs)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown: CancellationToken::new(),
        };

        tracing::info!(
            resolver = %resolver.endpoint(),
            storage_dir = %storage.root().display(),
            retention_secs = config.storage.retention.as_secs(),
            max_concurrent_jobs = config.download.max_concurrent_jobs,
            "Media downloader initialized"
        );

        Ok(Self {
            registry,
            event_tx,
            config: Arc::new(config),
            http,
            resolver,
            storage,
            queue_state,
        })
    }

    /// Accept a source URL and start processing it in the background
    ///
    /// Returns as soon as the job is registered; the job starts out `pending`.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the URL is empty or not an http(s) URL
    /// - [`Error::ShuttingDown`] once shutdown has begun
    pub async fn submit(&self, url: &str) -> Result<JobId> {
        if !self.queue_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let source_url = validate_source_url(url)?;
        let id = self.registry.create(source_url.clone()).await;
        tracing::info!(job_id = %id, source_url = %source_url, "Download accepted");

        self.spawn_job(id, source_url);
        Ok(id)
    }

    /// Current snapshot of a job
    pub async fn status(&self, id: JobId) -> Result<JobSnapshot> {
        self.registry
            .get(id)
            .await
            .map(|job| job.snapshot())
            .ok_or_else(|| JobError::NotFound { id }.into())
    }

    /// Locate the stored artifact of a ready job
    ///
    /// # Errors
    ///
    /// - [`JobError::NotFound`] if the job is unknown
    /// - [`JobError::NotReady`] if the job has not reached `ready`
    /// - [`JobError::FileMissing`] if the job is ready but its file is gone
    pub async fn ready_file(&self, id: JobId) -> Result<ReadyFile> {
        let job = self
            .registry
            .get(id)
            .await
            .ok_or(JobError::NotFound { id })?;

        if !matches!(job.state, JobState::Ready { .. }) {
            return Err(JobError::NotReady {
                id,
                status: job.status(),
            }
            .into());
        }

        let metadata = match tokio::fs::metadata(&job.storage_path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                return Err(JobError::FileMissing {
                    id,
                    path: job.storage_path,
                }
                .into());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    job_id = %id,
                    path = %job.storage_path.display(),
                    "Ready download has no file on disk"
                );
                return Err(JobError::FileMissing {
                    id,
                    path: job.storage_path,
                }
                .into());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        Ok(ReadyFile {
            path: job.storage_path,
            filename: job
                .filename
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            size: metadata.len(),
        })
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{MediaDownloader, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MediaDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "download event");
    ///         }
    ///     });
    ///
    ///     downloader.submit("https://example.com/watch?v=abc").await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Run one expiry pass immediately
    pub async fn sweep_now(&self) -> SweepReport {
        self.sweeper().sweep_once().await
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Number of jobs currently held in the registry
    pub async fn job_count(&self) -> usize {
        self.registry.len().await
    }

    fn sweeper(&self) -> ExpirySweeper {
        ExpirySweeper::new(
            self.registry.clone(),
            self.storage.clone(),
            self.config.storage.retention,
            self.config.storage.sweep_interval,
        )
    }
}

/// Trim and check a submitted URL
fn validate_source_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("URL is required".to_string()));
    }

    match url::Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(trimmed.to_string())
        }
        Ok(_) => Err(Error::Validation(
            "URL must use the http or https scheme".to_string(),
        )),
        Err(e) => Err(Error::Validation(format!("invalid URL: {}", e))),
    }
}
