//! Linear orchestration of the analysis stages.

use std::sync::Arc;

use anyhow::anyhow;
use tracing::{Instrument, error, info, info_span};

use crate::{
    config::PipelineConfig,
    services::{LanguageModel, ProgressSink, TextStorage, TranscriptProvider, report_progress},
    stages::{AssembleStage, FinalizeStage, Stage, SummarizeStage, TranscriptStage, VisualizeStage},
    state::PipelineState,
    types::FinalOutput,
};

/// Collaborators the stages are built from.
#[derive(Clone)]
pub struct PipelineDeps {
    pub transcripts: Arc<dyn TranscriptProvider>,
    pub storage: Arc<dyn TextStorage>,
    pub model: Arc<dyn LanguageModel>,
    pub progress: Arc<dyn ProgressSink>,
}

pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    progress: Arc<dyn ProgressSink>,
}

impl Pipeline {
    /// transcript → summarize → visualize → assemble → finalize
    pub fn new(deps: PipelineDeps, config: PipelineConfig) -> Self {
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(TranscriptStage::new(
                deps.transcripts,
                deps.storage,
                deps.progress.clone(),
            )),
            Arc::new(SummarizeStage::new(
                deps.model.clone(),
                deps.progress.clone(),
                config.clone(),
            )),
            Arc::new(VisualizeStage::new(
                deps.model.clone(),
                deps.progress.clone(),
                config.clone(),
            )),
            Arc::new(AssembleStage::new(
                deps.model,
                deps.progress.clone(),
                config,
            )),
            Arc::new(FinalizeStage::new(deps.progress.clone())),
        ];
        Self::from_stages(stages, deps.progress)
    }

    pub fn from_stages(stages: Vec<Arc<dyn Stage>>, progress: Arc<dyn ProgressSink>) -> Self {
        Self { stages, progress }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every stage in order. Never fails: anything a stage cannot contain,
    /// including a panic, becomes a failure output.
    pub async fn run(&self, source_url: &str, job_id: &str, user_id: &str) -> FinalOutput {
        let span = info_span!("pipeline", job_id, user_id);
        self.run_stages(source_url, job_id, user_id)
            .instrument(span)
            .await
    }

    async fn run_stages(&self, source_url: &str, job_id: &str, user_id: &str) -> FinalOutput {
        report_progress(self.progress.as_ref(), job_id, 0, "Starting analysis...").await;
        info!(url = source_url, "Analysis started");

        let mut state = PipelineState::new(source_url, job_id, user_id);
        for stage in &self.stages {
            state = match run_stage(stage.clone(), state).await {
                Ok(next) => next,
                Err(e) => return self.fail(source_url, job_id, user_id, &e).await,
            };
        }

        match state.into_final_output() {
            Some(output) => {
                info!(success = output.success, "Analysis finished");
                output
            }
            None => {
                let e = anyhow!("pipeline finished without a final output");
                self.fail(source_url, job_id, user_id, &e).await
            }
        }
    }

    async fn fail(
        &self,
        source_url: &str,
        job_id: &str,
        user_id: &str,
        e: &anyhow::Error,
    ) -> FinalOutput {
        let message = format!("{:#}", e);
        error!("Analysis failed: {}", message);
        report_progress(
            self.progress.as_ref(),
            job_id,
            -1,
            &format!("Analysis failed: {}", message),
        )
        .await;
        FinalOutput::failure(source_url, job_id, user_id, &message)
    }
}

/// Runs on its own task so a panicking stage surfaces as an error here.
async fn run_stage(stage: Arc<dyn Stage>, state: PipelineState) -> anyhow::Result<PipelineState> {
    let name = stage.name();
    let span = info_span!("stage", stage = name);
    let handle = tokio::spawn(async move { stage.run(state).await }.instrument(span));
    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(anyhow!("stage {} panicked", name)),
        Err(e) => Err(anyhow!("stage {} was cancelled: {}", name, e)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{error::ProgressError, services::NoopProgress};

    struct Named(&'static str, Arc<Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl Stage for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn run(&self, state: PipelineState) -> anyhow::Result<PipelineState> {
            self.1.lock().unwrap().push(self.0);
            Ok(state)
        }
    }

    struct Panics;

    #[async_trait]
    impl Stage for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        async fn run(&self, _state: PipelineState) -> anyhow::Result<PipelineState> {
            panic!("stage blew up");
        }
    }

    #[derive(Default)]
    struct Recorded(Mutex<Vec<(i32, String)>>);

    #[async_trait]
    impl ProgressSink for Recorded {
        async fn report(&self, _job: &str, percent: i32, message: &str) -> Result<(), ProgressError> {
            self.0.lock().unwrap().push((percent, message.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn stages_run_in_order_and_missing_output_fails() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(Named("first", seen.clone())),
            Arc::new(Named("second", seen.clone())),
        ];
        let pipeline = Pipeline::from_stages(stages, Arc::new(NoopProgress));

        let output = pipeline.run("url", "job", "user").await;

        assert_eq!(*seen.lock().unwrap(), ["first", "second"]);
        assert!(!output.success);
        assert_eq!(output.title, "Report Generation Failed");
    }

    #[tokio::test]
    async fn panicking_stage_becomes_a_failure_output() {
        let progress = Arc::new(Recorded::default());
        let stages: Vec<Arc<dyn Stage>> = vec![Arc::new(Panics)];
        let pipeline = Pipeline::from_stages(stages, progress.clone());

        let output = pipeline.run("url", "job", "user").await;

        assert!(!output.success);
        assert!(output.summary.starts_with("Workflow execution error: stage panics panicked"));
        let reported = progress.0.lock().unwrap().clone();
        assert_eq!(reported.first().map(|r| r.0), Some(0));
        assert_eq!(reported.last().map(|r| r.0), Some(-1));
        assert!(reported.last().unwrap().1.starts_with("Analysis failed: "));
    }
}
