//! Synthetic progress for transfers without a known size.

use crate::registry::{JobRegistry, JobUpdate};
use crate::types::{ESTIMATE_CEILING, JobId, Progress, RESOLVED_PERCENT};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Background task nudging a job's progress forward on a fixed interval
///
/// The estimate starts from the resolved milestone, grows by `step` each tick
/// and stops at [`ESTIMATE_CEILING`]. It must be stopped with
/// [`stop`](Self::stop) before the job is marked ready, so it can never race
/// the completion transition.
pub(crate) struct ProgressEstimator {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressEstimator {
    /// Spawn the estimator for `id`
    pub(crate) fn spawn(
        registry: Arc<JobRegistry>,
        id: JobId,
        step: u8,
        interval: Duration,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut percent = RESOLVED_PERCENT;
            while percent < ESTIMATE_CEILING {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        percent = percent.saturating_add(step).min(ESTIMATE_CEILING);
                        registry
                            .update(id, JobUpdate::Progress(Progress::estimated(percent)))
                            .await;
                    }
                }
            }
            tracing::debug!(job_id = %id, percent, "Progress estimator stopped");
        });

        Self {
            cancel_token,
            handle,
        }
    }

    /// Cancel the estimator and wait for it to finish
    pub(crate) async fn stop(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Progress estimator task failed");
        }
    }
}
