use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    config::PipelineConfig,
    extract::extract_json_object,
    services::{LanguageModel, ProgressSink, Prompt, report_progress},
    stages::Stage,
    state::PipelineState,
    text::{char_len, split_paragraphs, split_sentences, take_chars},
    types::{
        ReportMetadata, ReportResult, ReportSection, SectionEntry, TextSection,
        VisualSection, VisualizationCandidate,
    },
};

const STRUCTURE_PROMPT: &str = r#"Convert the summary into structured sections with titles, levels, and keywords. Output only JSON:

{
  "sections": [
    {
      "id": "section_1",
      "title": "Section Title",
      "type": "text",
      "content": "Section content here",
      "level": 1,
      "keywords": ["keyword1", "keyword2"]
    }
  ]
}"#;

const BRIEF_KEYWORDS: &[&str] = &["key", "insight", "result", "summary", "finding"];

/// Report returned when there is nothing to assemble.
pub fn error_report(message: &str, job_id: &str, user_id: &str) -> ReportResult {
    let section = TextSection {
        id: "error_section".to_string(),
        title: "Error Details".to_string(),
        level: 1,
        content: format!(
            "An error occurred during report generation:\n\n{}\n\nPlease try again or contact support.",
            message
        ),
        keywords: vec!["error".to_string(), "failure".to_string()],
    };

    ReportResult {
        title: "Report Generation Failed".to_string(),
        summary_brief: format!("An error occurred while generating the report: {}", message),
        sections: vec![SectionEntry::Section(ReportSection::Text(section))],
        metadata: ReportMetadata {
            total_sections: 1,
            text_sections: 1,
            visual_sections: 0,
            generated_at: Utc::now().to_rfc3339(),
            user_id: user_id.to_string(),
            job_id: job_id.to_string(),
            error: true,
        },
    }
}

/// Paragraph-based sections used when the model's structure is unusable.
pub fn fallback_sections(summary: &str, min_chars: usize) -> Vec<SectionEntry> {
    split_paragraphs(summary)
        .iter()
        .enumerate()
        .filter(|(_, paragraph)| char_len(paragraph.trim()) > min_chars)
        .map(|(i, paragraph)| {
            SectionEntry::Section(ReportSection::Text(TextSection {
                id: format!("section_{}", i + 1),
                title: format!("Section {}", i + 1),
                level: 2,
                content: paragraph.trim().to_string(),
                keywords: Vec::new(),
            }))
        })
        .collect()
}

/// Model-proposed objects are always text sections; non-object entries are kept as-is.
fn text_entry(value: &Value) -> SectionEntry {
    if !value.is_object() {
        return SectionEntry::Malformed(value.clone());
    }
    match serde_json::from_value::<TextSection>(value.clone()) {
        Ok(section) => SectionEntry::Section(ReportSection::Text(section)),
        Err(_) => SectionEntry::Malformed(value.clone()),
    }
}

fn visual_entry(index: usize, candidate: &VisualizationCandidate) -> SectionEntry {
    SectionEntry::Section(ReportSection::Visualization(VisualSection {
        id: format!("visual_{}", index + 1),
        title: candidate.title.clone(),
        visualization_type: Some(candidate.kind),
        data: Some(candidate.payload.clone()),
        insight: candidate.insight.clone(),
        purpose: candidate.purpose.clone(),
        user_benefit: candidate.user_benefit.clone(),
        error: None,
    }))
}

/// Interleave visualizations after the text sections they are anchored to.
///
/// Candidates are stably sorted by `after_paragraph`; after text entry `i` every
/// pending candidate with `after_paragraph <= i` is emitted, and whatever is
/// left goes to the end in sorted order.
pub fn merge_visualizations(
    text_sections: Vec<SectionEntry>,
    candidates: &[VisualizationCandidate],
) -> Vec<SectionEntry> {
    let mut sorted: Vec<&VisualizationCandidate> = candidates.iter().collect();
    sorted.sort_by_key(|candidate| candidate.position.after_paragraph);
    let mut pending = sorted.into_iter().enumerate().peekable();

    let mut merged = Vec::with_capacity(text_sections.len() + candidates.len());
    for (i, entry) in text_sections.into_iter().enumerate() {
        merged.push(entry);
        while let Some((index, candidate)) =
            pending.next_if(|(_, candidate)| candidate.position.after_paragraph <= i)
        {
            merged.push(visual_entry(index, candidate));
        }
    }
    merged.extend(pending.map(|(index, candidate)| visual_entry(index, candidate)));
    merged
}

/// First line of the summary, shortened with `...` past `max_chars`.
pub fn extract_title(summary: &str, max_chars: usize) -> String {
    let first_line = summary.split('\n').next().unwrap_or_default();
    if char_len(first_line) > max_chars {
        let keep = max_chars.saturating_sub(3);
        return format!("{}...", take_chars(first_line, keep)).trim().to_string();
    }
    first_line.trim().to_string()
}

/// Two-sentence brief favoring sentences that announce results or findings.
pub fn create_brief(summary: &str) -> String {
    let sentences = split_sentences(summary);
    let mut picked: Vec<&str> = sentences
        .iter()
        .take(10)
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            BRIEF_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .map(|sentence| sentence.trim())
        .collect();

    if picked.is_empty() {
        picked = sentences
            .iter()
            .map(|sentence| sentence.trim())
            .filter(|sentence| !sentence.is_empty())
            .take(2)
            .collect();
    }

    let mut brief = picked.into_iter().take(2).collect::<Vec<_>>().join(". ");
    if !brief.ends_with('.') {
        brief.push('.');
    }
    brief
}

pub struct AssembleStage {
    model: Arc<dyn LanguageModel>,
    progress: Arc<dyn ProgressSink>,
    config: PipelineConfig,
}

impl AssembleStage {
    pub const NAME: &'static str = "assemble";

    pub fn new(
        model: Arc<dyn LanguageModel>,
        progress: Arc<dyn ProgressSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            model,
            progress,
            config,
        }
    }

    async fn structure_summary(&self, summary: &str) -> Vec<SectionEntry> {
        let reply = match self.model.generate(&Prompt::new(STRUCTURE_PROMPT, summary)).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Structuring summary failed: {}", e);
                return fallback_sections(summary, self.config.fallback_paragraph_min_chars);
            }
        };

        let entries: Vec<SectionEntry> = match extract_json_object(&reply) {
            Ok(structured) => structured
                .get("sections")
                .and_then(Value::as_array)
                .map(|sections| sections.iter().map(text_entry).collect())
                .unwrap_or_default(),
            Err(e) => {
                warn!("Could not parse structured sections: {}", e);
                Vec::new()
            }
        };

        if entries.is_empty() {
            info!("Falling back to paragraph sectioning");
            return fallback_sections(summary, self.config.fallback_paragraph_min_chars);
        }
        entries
    }
}

#[async_trait]
impl Stage for AssembleStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: PipelineState) -> anyhow::Result<PipelineState> {
        report_progress(
            self.progress.as_ref(),
            state.job_id(),
            80,
            "Finalizing report generation...",
        )
        .await;

        let summary = state.summary();
        if summary.is_empty() {
            warn!("Summary is missing");
            let report = error_report("Summary not available.", state.job_id(), state.user_id());
            return Ok(state.with_report(report));
        }

        let text_sections = self.structure_summary(summary).await;
        info!(
            text = text_sections.len(),
            visuals = state.visualizations().len(),
            "Merging visual sections into report"
        );
        let sections = merge_visualizations(text_sections, state.visualizations());

        let count = |text: bool| {
            sections
                .iter()
                .filter(|entry| match entry {
                    SectionEntry::Section(section) => section.is_text() == text,
                    SectionEntry::Malformed(_) => false,
                })
                .count()
        };
        let metadata = ReportMetadata {
            total_sections: sections.len(),
            text_sections: count(true),
            visual_sections: count(false),
            generated_at: Utc::now().to_rfc3339(),
            user_id: state.user_id().to_string(),
            job_id: state.job_id().to_string(),
            error: false,
        };

        let report = ReportResult {
            title: extract_title(summary, self.config.report_title_chars),
            summary_brief: create_brief(summary),
            sections,
            metadata,
        };
        info!(sections = report.sections.len(), "Report assembled");
        Ok(state.with_report(report))
    }
}
