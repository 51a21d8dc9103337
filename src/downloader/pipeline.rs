//! Job spawning and the resolve → acquire sequence.

use crate::error::Result;
use crate::registry::JobUpdate;
use crate::types::{JobId, Progress};
use tokio::task::JoinHandle;

use super::MediaDownloader;

/// Reason recorded when a job task dies without reporting an outcome
pub(crate) const INTERNAL_ERROR_REASON: &str = "internal error";

impl MediaDownloader {
    /// Spawn a job onto the tracker together with a supervisor
    ///
    /// The supervisor awaits the job's handle and turns a panic into a terminal
    /// `error` so no job stays `processing` forever.
    pub(crate) fn spawn_job(&self, id: JobId, source_url: String) {
        let downloader = self.clone();
        let handle = self
            .queue_state
            .tracker
            .spawn(async move { downloader.run_job(id, source_url).await });

        self.supervise(id, handle);
    }

    /// Await a job's handle on the tracker and record `internal error` if it died
    pub(crate) fn supervise(&self, id: JobId, handle: JoinHandle<()>) {
        let registry = self.registry.clone();
        self.queue_state.tracker.spawn(async move {
            if let Err(e) = handle.await {
                tracing::error!(job_id = %id, error = %e, "Download task died unexpectedly");
                registry
                    .update(
                        id,
                        JobUpdate::Error {
                            reason: INTERNAL_ERROR_REASON.to_string(),
                        },
                    )
                    .await;
            }
        });
    }

    /// Wait for an admission slot, then process the job and record its outcome
    async fn run_job(&self, id: JobId, source_url: String) {
        // Admission stays open for the downloader's lifetime, even across shutdown,
        // so accepted jobs always get a slot eventually
        let Ok(_permit) = self.queue_state.admission.clone().acquire_owned().await else {
            return;
        };

        match self.process_job(id, &source_url).await {
            Ok(filename) => {
                tracing::info!(job_id = %id, filename = %filename, "Download ready");
            }
            Err(e) => {
                let reason = e.failure_reason();
                tracing::error!(job_id = %id, error = %e, reason = %reason, "Download failed");
                self.registry
                    .update(id, JobUpdate::Error { reason })
                    .await;
            }
        }
    }

    /// Resolve the source URL, stream the media and mark the job ready
    async fn process_job(&self, id: JobId, source_url: &str) -> Result<String> {
        self.registry.update(id, JobUpdate::Processing).await;

        let plan = self.resolver.resolve(source_url).await?;
        tracing::debug!(job_id = %id, kind = ?plan.kind, "Resolver produced acquisition plan");

        self.registry
            .update(id, JobUpdate::Filename(plan.filename.clone()))
            .await;
        self.registry
            .update(id, JobUpdate::Progress(Progress::resolved()))
            .await;

        let path = self.storage.path_for(id);
        let bytes = self.acquire(id, &plan, &path).await?;
        tracing::debug!(job_id = %id, bytes, path = %path.display(), "Artifact written");

        self.registry
            .update(
                id,
                JobUpdate::Ready {
                    filename: plan.filename.clone(),
                },
            )
            .await;
        Ok(plan.filename)
    }
}
