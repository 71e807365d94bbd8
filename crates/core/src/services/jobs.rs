//! Job records tracked around a pipeline run.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    error::{JobStoreError, ProgressError},
    services::progress::ProgressSink,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub user_id: String,
    pub source_url: String,
    pub status: JobStatus,
    pub progress: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn processing(job_id: &str, user_id: &str, source_url: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            user_id: user_id.to_string(),
            source_url: source_url.to_string(),
            status: JobStatus::Processing,
            progress: 0,
            message: "Queued".to_string(),
            report_key: None,
            audio_key: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Terminal update applied once a run is over.
#[derive(Clone, Debug, Default)]
pub struct JobOutcome {
    pub report_key: Option<String>,
    pub audio_key: Option<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, record: JobRecord) -> Result<(), JobStoreError>;
    async fn finish(
        &self,
        job_id: &str,
        status: JobStatus,
        outcome: JobOutcome,
    ) -> Result<(), JobStoreError>;
    async fn get(&self, job_id: &str) -> Result<JobRecord, JobStoreError>;
}

/// In-process job store. Also accepts progress updates so pollers see live percentages.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, record: JobRecord) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.job_id) {
            return Err(JobStoreError::Duplicate {
                job_id: record.job_id,
            });
        }
        jobs.insert(record.job_id.clone(), record);
        Ok(())
    }

    async fn finish(
        &self,
        job_id: &str,
        status: JobStatus,
        outcome: JobOutcome,
    ) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::UnknownJob {
                job_id: job_id.to_string(),
            })?;

        job.status = status;
        job.report_key = outcome.report_key;
        job.audio_key = outcome.audio_key;
        job.error = outcome.error;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<JobRecord, JobStoreError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobStoreError::UnknownJob {
                job_id: job_id.to_string(),
            })
    }
}

#[async_trait]
impl ProgressSink for MemoryJobStore {
    async fn report(&self, job_id: &str, percent: i32, message: &str) -> Result<(), ProgressError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| ProgressError::UnknownJob {
                job_id: job_id.to_string(),
            })?;
        job.progress = percent;
        job.message = message.to_string();
        Ok(())
    }
}
