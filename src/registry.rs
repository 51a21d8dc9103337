//! In-memory job registry
//!
//! The registry exclusively owns every [`Job`] record. Writers go through
//! [`JobRegistry::update`] with a typed [`JobUpdate`], which enforces the state
//! machine:
//!
//! ```text
//! Pending ──► Processing ──► Ready
//!    │             │
//!    └─────────────┴───────► Error
//! ```
//!
//! `Ready` and `Error` are terminal. Progress never moves backwards while a job
//! is processing. Updates against a missing ID are silent no-ops and never
//! insert, so a record evicted by the sweeper cannot be resurrected by a late
//! write from the job's task.

use crate::storage::Storage;
use crate::types::{Event, Job, JobId, JobState, Progress, file_url};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{RwLock, broadcast};

/// A single mutation applied to a job record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobUpdate {
    /// The resolver call has been dispatched (`Pending` → `Processing`, progress 0)
    Processing,
    /// New progress value; ignored unless higher than the current one
    Progress(Progress),
    /// Resolved display name
    Filename(String),
    /// Artifact fully written (`Processing` → `Ready`, progress 100)
    Ready {
        /// Filename to present to clients
        filename: String,
    },
    /// Terminal failure
    Error {
        /// Why the job failed
        reason: String,
    },
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    by_path: HashMap<PathBuf, JobId>,
}

/// Concurrency-safe store mapping job IDs to their current state
pub struct JobRegistry {
    inner: RwLock<Inner>,
    storage: Storage,
    event_tx: broadcast::Sender<Event>,
}

impl JobRegistry {
    /// Create an empty registry whose records map onto `storage`
    pub fn new(storage: Storage, event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            storage,
            event_tx,
        }
    }

    /// Allocate a fresh ID and insert a `Pending` record for it
    pub async fn create(&self, source_url: impl Into<String>) -> JobId {
        let source_url = source_url.into();
        let mut inner = self.inner.write().await;

        let id = loop {
            let candidate = JobId::new();
            if !inner.jobs.contains_key(&candidate) {
                break candidate;
            }
        };

        let storage_path = self.storage.path_for(id);
        inner.by_path.insert(storage_path.clone(), id);
        inner.jobs.insert(
            id,
            Job {
                id,
                source_url: source_url.clone(),
                filename: None,
                storage_path,
                state: JobState::Pending,
                created_at: chrono::Utc::now(),
            },
        );
        drop(inner);

        self.event_tx.send(Event::Queued { id, source_url }).ok();
        id
    }

    /// Current record for `id`, if any
    pub async fn get(&self, id: JobId) -> Option<Job> {
        self.inner.read().await.jobs.get(&id).cloned()
    }

    /// Apply `update` to the record for `id`
    ///
    /// Returns `true` if the record changed. Missing IDs, terminal records,
    /// illegal transitions and non-increasing progress are all ignored.
    pub async fn update(&self, id: JobId, update: JobUpdate) -> bool {
        let event = {
            let mut inner = self.inner.write().await;
            let Some(job) = inner.jobs.get_mut(&id) else {
                tracing::debug!(job_id = %id, ?update, "Ignoring update for unknown job");
                return false;
            };
            match apply(job, update) {
                Ok(event) => event,
                Err(rejected) => {
                    tracing::debug!(
                        job_id = %id,
                        status = %job.status(),
                        reason = rejected,
                        "Ignoring job update"
                    );
                    return false;
                }
            }
        };

        if let Some(event) = event {
            self.event_tx.send(event).ok();
        }
        true
    }

    /// Remove the record for `id`
    ///
    /// Returns `true` if a record was removed.
    pub async fn delete(&self, id: JobId) -> bool {
        let removed = {
            let mut inner = self.inner.write().await;
            match inner.jobs.remove(&id) {
                Some(job) => {
                    inner.by_path.remove(&job.storage_path);
                    true
                }
                None => false,
            }
        };

        if removed {
            self.event_tx.send(Event::Evicted { id }).ok();
        }
        removed
    }

    /// Remove the record whose artifact lives at `path`
    ///
    /// Returns the evicted job's ID, or `None` for orphaned files.
    pub async fn evict_by_path(&self, path: &Path) -> Option<JobId> {
        let id = {
            let mut inner = self.inner.write().await;
            let id = inner.by_path.remove(path)?;
            inner.jobs.remove(&id);
            id
        };

        self.event_tx.send(Event::Evicted { id }).ok();
        Some(id)
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.inner.read().await.jobs.len()
    }

    /// Whether the registry holds no records
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.jobs.is_empty()
    }
}

/// Apply one update to a job, returning the event to publish on success
fn apply(job: &mut Job, update: JobUpdate) -> Result<Option<Event>, &'static str> {
    if job.is_terminal() {
        return Err("job is terminal");
    }

    let id = job.id;
    match update {
        JobUpdate::Processing => match job.state {
            JobState::Pending => {
                job.state = JobState::Processing {
                    progress: Progress::start(),
                };
                Ok(Some(Event::Processing { id }))
            }
            _ => Err("job already processing"),
        },
        JobUpdate::Progress(next) => match &mut job.state {
            JobState::Processing { progress } if next.percent > progress.percent => {
                *progress = next;
                Ok(Some(Event::Progress {
                    id,
                    percent: next.percent,
                    source: next.source,
                }))
            }
            JobState::Processing { .. } => Err("progress would not advance"),
            _ => Err("progress outside processing"),
        },
        JobUpdate::Filename(filename) => {
            job.filename = Some(filename);
            Ok(None)
        }
        JobUpdate::Ready { filename } => match job.state {
            JobState::Processing { .. } => {
                job.filename = Some(filename.clone());
                job.state = JobState::Ready {
                    file_url: file_url(id),
                };
                Ok(Some(Event::Ready { id, filename }))
            }
            _ => Err("ready requires processing"),
        },
        JobUpdate::Error { reason } => {
            let progress = job.progress();
            job.state = JobState::Error {
                reason: reason.clone(),
                progress,
            };
            Ok(Some(Event::Failed { id, error: reason }))
        }
    }
}
