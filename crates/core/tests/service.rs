mod common;

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use common::{
    CONTEXT, FailingStorage, RecordingNarration, STRUCTURE, SUMMARY, ScriptedModel,
    StaticTranscripts, long_summary,
};
use vidreport_core::{
    AnalysisRequest, FinalOutput, MetadataError, Pipeline, PipelineConfig, PipelineDeps,
    PipelineState, ProcessInfo, ReportService, Statistics,
    services::{
        FsTextStorage, JobStatus, MemoryJobStore, MemoryTextStorage, MetadataProvider,
        NoopProgress, TextStorage, VideoMetadata,
    },
    stages::Stage,
};

struct Canned(FinalOutput);

#[async_trait]
impl Stage for Canned {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn run(&self, state: PipelineState) -> anyhow::Result<PipelineState> {
        Ok(state.with_final_output(self.0.clone()))
    }
}

struct Broken;

#[async_trait]
impl Stage for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn run(&self, _state: PipelineState) -> anyhow::Result<PipelineState> {
        bail!("model quota exhausted")
    }
}

struct PanickingMetadata;

#[async_trait]
impl MetadataProvider for PanickingMetadata {
    async fn lookup(&self, _url: &str) -> Result<VideoMetadata, MetadataError> {
        panic!("metadata backend crashed");
    }
}

fn request(include_audio: bool) -> AnalysisRequest {
    AnalysisRequest {
        source_url: "https://youtu.be/abc".to_string(),
        user_id: "user-1".to_string(),
        include_audio,
    }
}

fn canned_output() -> FinalOutput {
    FinalOutput {
        success: true,
        title: "Canned".to_string(),
        summary: "Brief.".to_string(),
        sections: Vec::new(),
        statistics: Statistics::default(),
        process_info: ProcessInfo::default(),
    }
}

#[tokio::test]
async fn completed_job_stores_report_and_narration() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FsTextStorage::new(dir.path()));
    let jobs = Arc::new(MemoryJobStore::new());
    let model = Arc::new(
        ScriptedModel::new()
            .on(SUMMARY, long_summary())
            .on(CONTEXT, r#"{"visualization_opportunities": []}"#)
            .on(STRUCTURE, r#"{"sections": [{"title": "Only", "content": "Body"}]}"#),
    );
    let pipeline = Pipeline::new(
        PipelineDeps {
            transcripts: Arc::new(StaticTranscripts(Ok("A talk about growth.".to_string()))),
            storage: storage.clone(),
            model,
            progress: jobs.clone(),
        },
        PipelineConfig::default(),
    );
    let narration = Arc::new(RecordingNarration::default());
    let service = Arc::new(
        ReportService::new(
            Arc::new(pipeline),
            jobs.clone(),
            storage.clone(),
            PipelineConfig::default().with_narration_char_budget(10),
        )
        .with_narration(narration.clone()),
    );

    let submitted = service.submit(request(true)).await.unwrap();
    let outcome = submitted.handle.await.unwrap().unwrap();

    assert!(outcome.output.success);
    let record = service.status(&submitted.job_id).await.unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.progress, 100);
    assert_eq!(record.message, "Analysis complete!");

    let key = format!("reports/user-1/{}/report.json", submitted.job_id);
    assert_eq!(record.report_key.as_deref(), Some(key.as_str()));
    assert_eq!(
        record.audio_key,
        Some(format!("audio/{}.mp3", submitted.job_id))
    );

    let saved: serde_json::Value =
        serde_json::from_str(&storage.get(&key).await.unwrap()).unwrap();
    assert_eq!(saved["report"]["success"], true);
    assert_eq!(saved["report"]["sections"][0]["title"], "Only");
    assert_eq!(saved["metadata"]["job_id"], submitted.job_id.as_str());
    assert!(dir.path().join(&key).exists());

    let narrated = narration.0.lock().unwrap().clone();
    assert_eq!(narrated.len(), 1);
    assert_eq!(narrated[0].chars().count(), 13);
    assert!(narrated[0].ends_with("..."));
}

#[tokio::test]
async fn storage_failures_do_not_fail_the_job() {
    let storage = Arc::new(FailingStorage::default());
    let jobs = Arc::new(MemoryJobStore::new());
    let model = Arc::new(
        ScriptedModel::new()
            .on(SUMMARY, long_summary())
            .on(CONTEXT, r#"{"visualization_opportunities": []}"#)
            .on(STRUCTURE, r#"{"sections": [{"title": "Only", "content": "Body"}]}"#),
    );
    let pipeline = Pipeline::new(
        PipelineDeps {
            transcripts: Arc::new(StaticTranscripts(Ok("A talk about growth.".to_string()))),
            storage: storage.clone(),
            model,
            progress: jobs.clone(),
        },
        PipelineConfig::default(),
    );
    let service = Arc::new(ReportService::new(
        Arc::new(pipeline),
        jobs.clone(),
        storage.clone(),
        PipelineConfig::default(),
    ));

    let submitted = service.submit(request(false)).await.unwrap();
    let outcome = submitted.handle.await.unwrap().unwrap();

    assert!(outcome.output.success);
    assert!(outcome.report_key.is_none());
    assert_eq!(
        *storage.puts.lock().unwrap(),
        [
            format!("transcripts/user-1/{}_transcript.txt", submitted.job_id),
            format!("reports/user-1/{}/report.json", submitted.job_id),
        ]
    );

    let record = service.status(&submitted.job_id).await.unwrap();
    assert_eq!(record.status, JobStatus::Completed);
    assert!(record.report_key.is_none());
    assert!(record.error.is_none());
}

#[tokio::test]
async fn failed_run_marks_the_job_failed_without_a_report() {
    let jobs = Arc::new(MemoryJobStore::new());
    let storage = Arc::new(MemoryTextStorage::new());
    let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(Broken)];
    let pipeline = Pipeline::from_stages(stages, jobs.clone());
    let service = Arc::new(ReportService::new(
        Arc::new(pipeline),
        jobs.clone(),
        storage.clone(),
        PipelineConfig::default(),
    ));

    let submitted = service.submit(request(true)).await.unwrap();
    let outcome = submitted.handle.await.unwrap().unwrap();

    assert!(!outcome.output.success);
    assert!(outcome.report_key.is_none());
    assert!(outcome.narration.is_none());

    let record = service.status(&submitted.job_id).await.unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.progress, -1);
    assert!(record.error.unwrap().contains("model quota exhausted"));
    assert!(record.report_key.is_none());
    assert!(storage.keys().await.is_empty());
}

#[tokio::test]
async fn panic_during_processing_marks_the_job_failed() {
    let jobs = Arc::new(MemoryJobStore::new());
    let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(Canned(canned_output()))];
    let pipeline = Pipeline::from_stages(stages, Arc::new(NoopProgress));
    let service = Arc::new(
        ReportService::new(
            Arc::new(pipeline),
            jobs.clone(),
            Arc::new(MemoryTextStorage::new()),
            PipelineConfig::default(),
        )
        .with_metadata(Arc::new(PanickingMetadata)),
    );

    let submitted = service.submit(request(false)).await.unwrap();

    assert!(submitted.handle.await.unwrap().is_none());
    let record = service.status(&submitted.job_id).await.unwrap();
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.completed_at.is_some());
    assert!(record.error.unwrap().starts_with("Job run aborted"));
}

#[tokio::test]
async fn unknown_jobs_are_reported() {
    let service = ReportService::new(
        Arc::new(Pipeline::from_stages(Vec::new(), Arc::new(NoopProgress))),
        Arc::new(MemoryJobStore::new()),
        Arc::new(MemoryTextStorage::new()),
        PipelineConfig::default(),
    );
    assert!(service.status("missing").await.is_err());
}
