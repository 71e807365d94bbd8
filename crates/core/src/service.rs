//! Job lifecycle around a pipeline run: record keeping, report persistence and
//! optional narration.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    cache::report_key,
    config::PipelineConfig,
    error::ServiceError,
    pipeline::Pipeline,
    services::{
        JobOutcome, JobRecord, JobStatus, JobStore, MetadataProvider, Narration,
        NarrationProvider, TextStorage, VideoMetadata,
    },
    text::{char_len, take_chars},
    types::FinalOutput,
};

#[derive(Clone, Debug)]
pub struct AnalysisRequest {
    pub source_url: String,
    pub user_id: String,
    pub include_audio: bool,
}

#[derive(Clone, Debug)]
pub struct ProcessOutcome {
    pub output: FinalOutput,
    pub report_key: Option<String>,
    pub narration: Option<Narration>,
}

/// A job that has been accepted and is running in the background.
pub struct SubmittedJob {
    pub job_id: String,
    /// Resolves to `None` when the run panicked; the job is already marked failed then.
    pub handle: JoinHandle<Option<ProcessOutcome>>,
}

#[derive(Serialize)]
struct EnvelopeMetadata<'a> {
    job_id: &'a str,
    user_id: &'a str,
    source_url: &'a str,
    created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<VideoMetadata>,
}

#[derive(Serialize)]
struct ReportEnvelope<'a> {
    report: &'a FinalOutput,
    metadata: EnvelopeMetadata<'a>,
}

pub struct ReportService {
    pipeline: Arc<Pipeline>,
    jobs: Arc<dyn JobStore>,
    storage: Arc<dyn TextStorage>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    narration: Option<Arc<dyn NarrationProvider>>,
    config: PipelineConfig,
}

impl ReportService {
    pub fn new(
        pipeline: Arc<Pipeline>,
        jobs: Arc<dyn JobStore>,
        storage: Arc<dyn TextStorage>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            pipeline,
            jobs,
            storage,
            metadata: None,
            narration: None,
            config,
        }
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_narration(mut self, narration: Arc<dyn NarrationProvider>) -> Self {
        self.narration = Some(narration);
        self
    }

    /// Record a new job and start it in the background.
    pub async fn submit(self: &Arc<Self>, request: AnalysisRequest) -> Result<SubmittedJob, ServiceError> {
        let job_id = Uuid::new_v4().to_string();
        self.jobs
            .create(JobRecord::processing(&job_id, &request.user_id, &request.source_url))
            .await?;
        info!(job_id, url = request.source_url, "Job submitted");

        let service = Arc::clone(self);
        let id = job_id.clone();
        let handle = tokio::spawn(async move {
            let runner = Arc::clone(&service);
            let run_id = id.clone();
            let run = tokio::spawn(async move { runner.process(&run_id, &request).await });
            match run.await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!(job_id = id, "Job run aborted: {}", e);
                    service.mark_failed(&id, format!("Job run aborted: {}", e)).await;
                    None
                }
            }
        });

        Ok(SubmittedJob { job_id, handle })
    }

    /// Run the pipeline for an existing job and record the result.
    pub async fn process(&self, job_id: &str, request: &AnalysisRequest) -> ProcessOutcome {
        let span = info_span!("job", job_id, user_id = request.user_id);
        async {
            let output = self
                .pipeline
                .run(&request.source_url, job_id, &request.user_id)
                .await;

            let (report_key, narration) = if output.success {
                let report_key = self.save_report(job_id, request, &output).await;
                let narration = if request.include_audio {
                    self.narrate(job_id, &output.summary).await
                } else {
                    None
                };
                (report_key, narration)
            } else {
                (None, None)
            };

            let status = if output.success {
                JobStatus::Completed
            } else {
                JobStatus::Failed
            };
            let outcome = JobOutcome {
                report_key: report_key.clone(),
                audio_key: narration.as_ref().map(|n| n.storage_key.clone()),
                error: output.process_info.error.clone(),
            };
            if let Err(e) = self.jobs.finish(job_id, status, outcome).await {
                error!("Failed to record job outcome: {}", e);
            }
            info!(status = status.as_str(), "Job finished");

            ProcessOutcome {
                output,
                report_key,
                narration,
            }
        }
        .instrument(span)
        .await
    }

    pub async fn status(&self, job_id: &str) -> Result<JobRecord, ServiceError> {
        Ok(self.jobs.get(job_id).await?)
    }

    async fn mark_failed(&self, job_id: &str, message: String) {
        let outcome = JobOutcome {
            error: Some(message),
            ..JobOutcome::default()
        };
        if let Err(e) = self.jobs.finish(job_id, JobStatus::Failed, outcome).await {
            error!(job_id, "Failed to mark job as failed: {}", e);
        }
    }

    async fn video_metadata(&self, url: &str) -> Option<VideoMetadata> {
        let provider = self.metadata.as_ref()?;
        match provider.lookup(url).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Video metadata lookup failed (ignored): {}", e);
                None
            }
        }
    }

    async fn save_report(
        &self,
        job_id: &str,
        request: &AnalysisRequest,
        output: &FinalOutput,
    ) -> Option<String> {
        let key = report_key(&request.user_id, job_id);
        let envelope = ReportEnvelope {
            report: output,
            metadata: EnvelopeMetadata {
                job_id,
                user_id: &request.user_id,
                source_url: &request.source_url,
                created_at: Utc::now().to_rfc3339(),
                video: self.video_metadata(&request.source_url).await,
            },
        };

        let result = match serde_json::to_string_pretty(&envelope) {
            Ok(json) => self.storage.put(&key, &json).await.map_err(ServiceError::from),
            Err(e) => Err(ServiceError::from(e)),
        };
        match result {
            Ok(()) => {
                info!(key, "Report saved");
                Some(key)
            }
            Err(e) => {
                error!(key, "Failed to save report: {}", e);
                None
            }
        }
    }

    async fn narrate(&self, job_id: &str, brief: &str) -> Option<Narration> {
        let provider = self.narration.as_ref()?;
        let budget = self.config.narration_char_budget;
        let text = if char_len(brief) > budget {
            format!("{}...", take_chars(brief, budget))
        } else {
            brief.to_string()
        };

        match provider.narrate(job_id, &text).await {
            Ok(narration) => {
                info!(key = narration.storage_key, "Narration generated");
                Some(narration)
            }
            Err(e) => {
                warn!("Narration failed (ignored): {}", e);
                None
            }
        }
    }
}
