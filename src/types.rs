//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Progress reported once the resolver has produced an acquisition plan
pub const RESOLVED_PERCENT: u8 = 10;

/// Highest value the synthetic estimator may report
pub const ESTIMATE_CEILING: u8 = 99;

/// Unique identifier for a download job
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Retrieval reference handed out once a job is ready
pub fn file_url(id: JobId) -> String {
    format!("/download/{}/file", id)
}

/// Job status as exposed to pollers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Accepted, waiting for the processing task to dispatch the resolver call
    Pending,
    /// Resolving or transferring
    Processing,
    /// Artifact stored and ready to be served
    Ready,
    /// Failed with a reason
    Error,
}

impl Status {
    /// Whether no further transition can happen from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Ready | Status::Error)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Ready => "ready",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// Where a progress value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProgressSource {
    /// Fixed value set at a lifecycle boundary (start, resolved, complete)
    Milestone,
    /// Derived from bytes transferred against the advertised total
    Observed,
    /// Synthetic value advanced on a timer when no total is known
    Estimated,
}

/// A progress percentage tagged with its provenance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Progress {
    /// Percentage in `0..=100`
    pub percent: u8,
    /// Provenance of `percent`
    pub source: ProgressSource,
}

impl Progress {
    /// Progress when processing starts
    pub fn start() -> Self {
        Self {
            percent: 0,
            source: ProgressSource::Milestone,
        }
    }

    /// Progress once the resolver has answered
    pub fn resolved() -> Self {
        Self {
            percent: RESOLVED_PERCENT,
            source: ProgressSource::Milestone,
        }
    }

    /// Progress once the artifact is fully written
    pub fn complete() -> Self {
        Self {
            percent: 100,
            source: ProgressSource::Milestone,
        }
    }

    /// Byte-level progress mapped into the acquisition range `[10, 100]`
    ///
    /// A zero `total` is treated as complete.
    pub fn observed(transferred: u64, total: u64) -> Self {
        let span = u128::from(100 - RESOLVED_PERCENT);
        let percent = if total == 0 {
            100
        } else {
            let scaled = span * u128::from(transferred) / u128::from(total);
            (u128::from(RESOLVED_PERCENT) + scaled).min(100) as u8
        };
        Self {
            percent,
            source: ProgressSource::Observed,
        }
    }

    /// Synthetic progress, capped at [`ESTIMATE_CEILING`]
    pub fn estimated(percent: u8) -> Self {
        Self {
            percent: percent.min(ESTIMATE_CEILING),
            source: ProgressSource::Estimated,
        }
    }
}

/// Lifecycle state of a job
///
/// Each variant carries only the data valid for it, so a ready job always has a
/// retrieval reference and a failed job always has a reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobState {
    /// Accepted, not yet dispatched to the resolver
    Pending,
    /// Resolving or transferring
    Processing {
        /// Latest progress
        progress: Progress,
    },
    /// Artifact stored
    Ready {
        /// Retrieval reference (file endpoint path)
        file_url: String,
    },
    /// Terminal failure
    Error {
        /// Why the job failed
        reason: String,
        /// Progress at the moment of failure
        progress: Progress,
    },
}

impl JobState {
    /// Status tag for this state
    pub fn status(&self) -> Status {
        match self {
            JobState::Pending => Status::Pending,
            JobState::Processing { .. } => Status::Processing,
            JobState::Ready { .. } => Status::Ready,
            JobState::Error { .. } => Status::Error,
        }
    }

    /// Progress implied by this state
    pub fn progress(&self) -> Progress {
        match self {
            JobState::Pending => Progress::start(),
            JobState::Processing { progress } | JobState::Error { progress, .. } => *progress,
            JobState::Ready { .. } => Progress::complete(),
        }
    }
}

/// Registry record for one download job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    /// Job identifier
    pub id: JobId,
    /// URL submitted by the caller
    pub source_url: String,
    /// Resolved display name, once known
    pub filename: Option<String>,
    /// Where the artifact is (or will be) stored
    pub storage_path: PathBuf,
    /// Current lifecycle state
    pub state: JobState,
    /// Creation timestamp (diagnostics only)
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Current status
    pub fn status(&self) -> Status {
        self.state.status()
    }

    /// Current progress
    pub fn progress(&self) -> Progress {
        self.state.progress()
    }

    /// Whether the job reached `Ready` or `Error`
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Point-in-time view for pollers
    pub fn snapshot(&self) -> JobSnapshot {
        let progress = self.progress();
        let (url, error) = match &self.state {
            JobState::Ready { file_url } => (Some(file_url.clone()), None),
            JobState::Error { reason, .. } => (None, Some(reason.clone())),
            JobState::Pending | JobState::Processing { .. } => (None, None),
        };
        JobSnapshot {
            id: self.id,
            status: self.status(),
            progress: progress.percent,
            progress_source: progress.source,
            url,
            source_url: self.source_url.clone(),
            filename: self.filename.clone(),
            error,
            created_at: self.created_at,
        }
    }
}

/// Job snapshot returned by the status endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    /// Job identifier
    pub id: JobId,
    /// Current status
    pub status: Status,
    /// Progress percentage (0 to 100)
    pub progress: u8,
    /// Provenance of `progress`
    pub progress_source: ProgressSource,
    /// Retrieval reference, set once ready
    pub url: Option<String>,
    /// URL submitted by the caller
    pub source_url: String,
    /// Resolved filename, once known
    pub filename: Option<String>,
    /// Failure reason, set only on error
    pub error: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
}

/// A ready artifact located on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadyFile {
    /// Path of the stored artifact
    pub path: PathBuf,
    /// Filename to present to the client
    pub filename: String,
    /// Size in bytes
    pub size: u64,
}

/// Event emitted during a job's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted
    Queued {
        /// Job ID
        id: JobId,
        /// Submitted URL
        source_url: String,
    },

    /// Resolver call dispatched
    Processing {
        /// Job ID
        id: JobId,
    },

    /// Progress advanced
    Progress {
        /// Job ID
        id: JobId,
        /// Progress percentage
        percent: u8,
        /// Provenance of `percent`
        source: ProgressSource,
    },

    /// Artifact stored and ready to be served
    Ready {
        /// Job ID
        id: JobId,
        /// Filename presented to clients
        filename: String,
    },

    /// Job failed
    Failed {
        /// Job ID
        id: JobId,
        /// Failure reason
        error: String,
    },

    /// Job removed from the registry
    Evicted {
        /// Job ID
        id: JobId,
    },

    /// Graceful shutdown initiated
    Shutdown,
}
