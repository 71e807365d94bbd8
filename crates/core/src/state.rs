//! The value threaded through the pipeline.
//!
//! Every stage takes the state by value and hands back a new one built through
//! the `with_*` methods below. Those are the only setters, so each field is
//! written by exactly one stage and never cleared afterwards.

use crate::types::{FinalOutput, ReportResult, VisualizationCandidate};

#[derive(Clone, Debug, Default)]
pub struct PipelineState {
    job_id: String,
    user_id: String,
    source_url: String,
    transcript: String,
    summary: String,
    visualizations: Vec<VisualizationCandidate>,
    report: Option<ReportResult>,
    final_output: Option<FinalOutput>,
}

impl PipelineState {
    pub fn new(source_url: &str, job_id: &str, user_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            user_id: user_id.to_string(),
            source_url: source_url.to_string(),
            ..Self::default()
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn visualizations(&self) -> &[VisualizationCandidate] {
        &self.visualizations
    }

    pub fn report(&self) -> Option<&ReportResult> {
        self.report.as_ref()
    }

    pub fn final_output(&self) -> Option<&FinalOutput> {
        self.final_output.as_ref()
    }

    pub fn into_final_output(self) -> Option<FinalOutput> {
        self.final_output
    }

    pub fn with_transcript(self, transcript: String) -> Self {
        Self { transcript, ..self }
    }

    pub fn with_summary(self, summary: String) -> Self {
        Self { summary, ..self }
    }

    pub fn with_visualizations(self, visualizations: Vec<VisualizationCandidate>) -> Self {
        Self {
            visualizations,
            ..self
        }
    }

    pub fn with_report(self, report: ReportResult) -> Self {
        Self {
            report: Some(report),
            ..self
        }
    }

    pub fn with_final_output(self, final_output: FinalOutput) -> Self {
        Self {
            final_output: Some(final_output),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_fields_keep_earlier_ones() {
        let state = PipelineState::new("https://youtu.be/x", "job", "user")
            .with_transcript("transcript".into())
            .with_summary("summary".into())
            .with_visualizations(Vec::new());

        assert_eq!(state.source_url(), "https://youtu.be/x");
        assert_eq!(state.job_id(), "job");
        assert_eq!(state.user_id(), "user");
        assert_eq!(state.transcript(), "transcript");
        assert_eq!(state.summary(), "summary");
        assert!(state.report().is_none());
        assert!(state.final_output().is_none());
    }
}
