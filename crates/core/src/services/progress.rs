use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ProgressError;

/// Receives percentage updates for a job. `-1` signals failure.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, job_id: &str, percent: i32, message: &str)
    -> Result<(), ProgressError>;
}

/// No-op sink for runs nobody is watching.
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn report(&self, _job_id: &str, _percent: i32, _message: &str) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// Best-effort progress update: failures are logged and dropped.
pub async fn report_progress(sink: &dyn ProgressSink, job_id: &str, percent: i32, message: &str) {
    if job_id.is_empty() {
        return;
    }
    debug!(job_id, percent, message, "progress");
    if let Err(e) = sink.report(job_id, percent, message).await {
        warn!(job_id, percent, "Failed to update progress (ignored): {}", e);
    }
}
