use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    extract::is_truthy,
    services::{ProgressSink, report_progress},
    stages::Stage,
    state::PipelineState,
    text::char_len,
    types::{
        FinalOutput, ProcessInfo, ReportSection, SectionEntry, Statistics, TextSection,
        VisualSection, VisualizationKind,
    },
};

/// Attach an error to visualizations whose payload cannot be rendered.
fn validate_visual(section: &mut VisualSection) {
    let Some(data) = section.data.as_ref().filter(|data| is_truthy(Some(data))) else {
        warn!(id = section.id, "Visualization has no data");
        section.error = Some("Missing visualization data".to_string());
        return;
    };

    let missing = match section.visualization_type {
        Some(VisualizationKind::Chart) if !is_truthy(data.get("config")) => {
            Some("Missing chart configuration")
        }
        Some(VisualizationKind::Network) if !is_truthy(data.get("data")) => {
            Some("Missing network data")
        }
        Some(VisualizationKind::Flow) if !is_truthy(data.get("data")) => {
            Some("Missing flowchart data")
        }
        _ => None,
    };
    if let Some(message) = missing {
        warn!(id = section.id, "{}", message);
        section.error = Some(message.to_string());
    }
}

fn malformed_to_text(index: usize, value: &Value) -> TextSection {
    warn!("Unexpected section format: {}", value);
    TextSection {
        id: format!("section_{}", index + 1),
        title: format!("Section {}", index + 1),
        level: 2,
        content: value
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        keywords: Vec::new(),
    }
}

/// Turn assembled entries into renderable sections. Nothing is dropped.
pub fn normalize_sections(entries: &[SectionEntry]) -> Vec<ReportSection> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            SectionEntry::Malformed(value) => ReportSection::Text(malformed_to_text(i, value)),
            SectionEntry::Section(ReportSection::Text(section)) => {
                let mut section = section.clone();
                if section.id.is_empty() {
                    section.id = format!("section_{}", i + 1);
                }
                if section.title.is_empty() {
                    section.title = format!("Section {}", i + 1);
                }
                ReportSection::Text(section)
            }
            SectionEntry::Section(ReportSection::Visualization(section)) => {
                let mut section = section.clone();
                validate_visual(&mut section);
                ReportSection::Visualization(section)
            }
        })
        .collect()
}

pub struct FinalizeStage {
    progress: Arc<dyn ProgressSink>,
}

impl FinalizeStage {
    pub const NAME: &'static str = "finalize";

    pub fn new(progress: Arc<dyn ProgressSink>) -> Self {
        Self { progress }
    }
}

#[async_trait]
impl Stage for FinalizeStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: PipelineState) -> anyhow::Result<PipelineState> {
        report_progress(self.progress.as_ref(), state.job_id(), 100, "Analysis complete!").await;

        let report = state
            .report()
            .ok_or_else(|| anyhow!("no report was assembled for job {}", state.job_id()))?;

        let sections = normalize_sections(&report.sections);
        let output = FinalOutput {
            success: !report.metadata.error,
            title: report.title.clone(),
            summary: report.summary_brief.clone(),
            statistics: Statistics::from_sections(&sections),
            sections,
            process_info: ProcessInfo {
                source_url: state.source_url().to_string(),
                transcript_length: char_len(state.transcript()),
                summary_length: char_len(state.summary()),
                user_id: state.user_id().to_string(),
                job_id: state.job_id().to_string(),
                generated_at: report.metadata.generated_at.clone(),
                error: None,
            },
        };

        info!(
            success = output.success,
            sections = output.statistics.total_sections,
            visualizations = output.statistics.visualizations,
            "Report finalized"
        );
        Ok(state.with_final_output(output))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        services::NoopProgress,
        stages::assemble::error_report,
        types::{ReportMetadata, ReportResult},
    };

    fn visual(kind: VisualizationKind, data: Option<Value>) -> SectionEntry {
        SectionEntry::Section(ReportSection::Visualization(VisualSection {
            id: "visual_1".into(),
            title: "Chart".into(),
            visualization_type: Some(kind),
            data,
            insight: String::new(),
            purpose: String::new(),
            user_benefit: String::new(),
            error: None,
        }))
    }

    fn error_of(section: &ReportSection) -> Option<&str> {
        match section {
            ReportSection::Visualization(v) => v.error.as_deref(),
            ReportSection::Text(_) => None,
        }
    }

    fn state_with(sections: Vec<SectionEntry>) -> PipelineState {
        let report = ReportResult {
            title: "Title".into(),
            summary_brief: "Brief.".into(),
            sections,
            metadata: ReportMetadata {
                generated_at: "2026-01-01T00:00:00+00:00".into(),
                ..ReportMetadata::default()
            },
        };
        PipelineState::new("https://youtu.be/x", "job", "user")
            .with_transcript("héllo".into())
            .with_summary("summary".into())
            .with_report(report)
    }

    #[test]
    fn invalid_visualizations_are_flagged_but_kept() {
        let sections = normalize_sections(&[
            visual(VisualizationKind::Chart, Some(json!({"labels": ["a"]}))),
            visual(VisualizationKind::Network, Some(json!({"data": {}}))),
            visual(VisualizationKind::Flow, Some(json!({"options": {}}))),
            visual(VisualizationKind::Table, None),
            visual(VisualizationKind::Table, Some(json!({"headers": []}))),
            visual(VisualizationKind::Chart, Some(json!({"config": {"type": "bar"}}))),
        ]);

        let errors: Vec<Option<&str>> = sections.iter().map(error_of).collect();
        assert_eq!(
            errors,
            [
                Some("Missing chart configuration"),
                Some("Missing network data"),
                Some("Missing flowchart data"),
                Some("Missing visualization data"),
                None,
                None,
            ]
        );
    }

    #[test]
    fn malformed_and_unnamed_entries_get_positional_defaults() {
        let sections = normalize_sections(&[
            SectionEntry::Malformed(json!("loose text")),
            SectionEntry::Section(ReportSection::Text(TextSection {
                id: String::new(),
                title: String::new(),
                level: 2,
                content: "Body".into(),
                keywords: Vec::new(),
            })),
        ]);

        assert_eq!(sections[0].id(), "section_1");
        assert_eq!(sections[1].id(), "section_2");
        assert_eq!(sections[1].title(), "Section 2");
        match &sections[0] {
            ReportSection::Text(text) => assert_eq!(text.content, "loose text"),
            other => panic!("unexpected section {:?}", other),
        }
    }

    #[tokio::test]
    async fn finalizing_twice_gives_the_same_output() {
        let stage = FinalizeStage::new(Arc::new(NoopProgress));
        let state = state_with(vec![visual(VisualizationKind::Chart, None)]);

        let once = stage.run(state).await.unwrap();
        let first = once.final_output().cloned().unwrap();
        let twice = stage.run(once).await.unwrap();

        assert_eq!(twice.final_output(), Some(&first));
        assert!(first.success);
        assert_eq!(first.statistics.visualizations, 1);
        assert_eq!(first.process_info.transcript_length, 5);
        assert_eq!(first.process_info.generated_at, "2026-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn error_reports_finalize_as_unsuccessful() {
        let stage = FinalizeStage::new(Arc::new(NoopProgress));
        let state = PipelineState::new("url", "job", "user")
            .with_report(error_report("Summary not available.", "job", "user"));

        let output = stage.run(state).await.unwrap().into_final_output().unwrap();

        assert!(!output.success);
        assert_eq!(output.title, "Report Generation Failed");
        assert_eq!(output.statistics.text_sections, 1);
    }

    #[tokio::test]
    async fn missing_report_is_an_error() {
        let stage = FinalizeStage::new(Arc::new(NoopProgress));
        let state = PipelineState::new("url", "job", "user");
        assert!(stage.run(state).await.is_err());
    }
}
