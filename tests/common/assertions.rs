//! Waiting helpers for job outcomes

use std::time::Duration;
use media_dl::{Event, JobId, JobSnapshot, MediaDownloader};

/// Result of waiting for a job to finish
#[derive(Debug)]
pub enum WaitResult {
    /// Artifact stored
    Ready(String),
    /// Job failed with a reason
    Failed(String),
    /// Timeout waiting for a terminal event
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait on the event stream until `id` becomes ready or fails
///
/// Subscribe before submitting, or the terminal event may already be gone.
pub async fn wait_for_outcome(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: JobId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Ready {
                    id: event_id,
                    filename,
                }) if event_id == id => return WaitResult::Ready(filename),
                Ok(Event::Failed {
                    id: event_id,
                    error,
                }) if event_id == id => return WaitResult::Failed(error),
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Poll the status endpoint equivalent until the job is terminal
pub async fn poll_until_terminal(downloader: &MediaDownloader, id: JobId) -> JobSnapshot {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let snapshot = downloader.status(id).await.expect("job vanished");
            if snapshot.status.is_terminal() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not reach a terminal state")
}
