//! Streaming media bytes from the acquisition URL to disk.

use crate::error::AcquireError;
use crate::registry::JobUpdate;
use crate::resolver::AcquisitionPlan;
use crate::types::{JobId, Progress, RESOLVED_PERCENT};
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::MediaDownloader;
use super::progress::ProgressEstimator;

impl MediaDownloader {
    /// Stream the plan's URL into `path`, reporting progress as bytes arrive
    ///
    /// On failure the partial file is removed before the error is returned.
    /// Returns the number of bytes written.
    pub(crate) async fn acquire(
        &self,
        id: JobId,
        plan: &AcquisitionPlan,
        path: &Path,
    ) -> Result<u64, AcquireError> {
        let result = self.stream_to_file(id, plan, path).await;

        if result.is_err() {
            match self.storage.remove(path).await {
                Ok(true) => {
                    tracing::debug!(job_id = %id, path = %path.display(), "Removed partial file")
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    job_id = %id,
                    path = %path.display(),
                    error = %e,
                    "Failed to remove partial file"
                ),
            }
        }

        result
    }

    async fn stream_to_file(
        &self,
        id: JobId,
        plan: &AcquisitionPlan,
        path: &Path,
    ) -> Result<u64, AcquireError> {
        let mut response = self.http.get(&plan.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let total = response.content_length().filter(|len| *len > 0);
        tracing::debug!(job_id = %id, total_bytes = ?total, "Media transfer started");

        let file = tokio::fs::File::create(path)
            .await
            .map_err(AcquireError::Write)?;
        let mut writer = BufWriter::new(file);

        // Without a known size, progress is estimated on a timer instead
        let estimator = match total {
            Some(_) => None,
            None => Some(ProgressEstimator::spawn(
                self.registry.clone(),
                id,
                self.config.download.estimate_step,
                self.config.download.estimate_interval,
            )),
        };

        let transfer: Result<u64, AcquireError> = async {
            let mut transferred: u64 = 0;
            let mut last_percent = RESOLVED_PERCENT;

            while let Some(chunk) = response.chunk().await? {
                writer
                    .write_all(&chunk)
                    .await
                    .map_err(AcquireError::Write)?;
                transferred += chunk.len() as u64;

                if let Some(total) = total {
                    let progress = Progress::observed(transferred, total);
                    if progress.percent != last_percent {
                        last_percent = progress.percent;
                        self.registry
                            .update(id, JobUpdate::Progress(progress))
                            .await;
                    }
                }
            }

            writer.flush().await.map_err(AcquireError::Write)?;
            writer
                .get_ref()
                .sync_all()
                .await
                .map_err(AcquireError::Write)?;
            Ok(transferred)
        }
        .await;

        if let Some(estimator) = estimator {
            estimator.stop().await;
        }

        transfer
    }
}
