use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::{
    config::PipelineConfig,
    error::ModelError,
    services::{LanguageModel, ProgressSink, Prompt, report_progress},
    stages::{Stage, transcript::is_usable_transcript},
    state::PipelineState,
    text::{char_len, split_sentences, truncate_with_marker},
};

pub const NO_VALID_TRANSCRIPT_SUMMARY: &str =
    "No valid transcript found. The transcript may be missing or failed to extract.";

const SUMMARY_PROMPT: &str = r#"You are an assistant that summarizes YouTube video captions into structured insights.

**Summarization Criteria:**
1. **Overall Summary**: Describe the general theme and message of the video in a concise way.
2. **Key Points**: Extract core arguments, conclusions, or findings.
3. **Contextual Details**: Mention context, conditions, related insights.
4. **Actionable Takeaways**: Summarize direct implications, suggestions, or results.
5. **Additional Information**: Add references, metrics, time markers, or other important mentions.

**Expected Output:**
- 1 paragraph summary
- 3~5 bullet points with key findings
- Short and clear
- 800 words max"#;

const ELABORATE_PROMPT: &str =
    "The initial summary was too short. Please provide a more detailed response.";

/// Sentences containing any of these are kept first when a transcript is reduced.
const IMPORTANCE_KEYWORDS: &[&str] = &[
    "summary",
    "key point",
    "insight",
    "finding",
    "result",
    "conclusion",
    "first",
    "second",
    "third",
    "main",
    "score",
    "criteria",
    "impact",
    "outcome",
    "recommendation",
    "evidence",
    "context",
    "reference",
    "trend",
];

const EDGE_SENTENCES: usize = 10;
const MAX_IMPORTANT: usize = 30;
const MAX_REGULAR: usize = 20;
const SEPARATOR: &str = ". ";

fn importance_score(sentence: &str) -> usize {
    let lower = sentence.to_lowercase();
    IMPORTANCE_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count()
}

/// Deduplicated, non-empty pieces joined in first-seen order.
fn join_unique<'a>(pieces: impl IntoIterator<Item = &'a str>) -> String {
    let mut seen = HashSet::new();
    pieces
        .into_iter()
        .filter(|piece| !piece.is_empty() && seen.insert(*piece))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Shrink a transcript to at most `limit` chars.
///
/// The opening and closing sentences are always kept. Sentences mentioning
/// importance keywords come next, ranked by how many they mention, followed by
/// an evenly spaced sample of the rest. Middle picks are admitted only while
/// the joined text still fits, and a final hard truncation (marker included)
/// guarantees the bound. Transcripts already within the limit pass through.
pub fn reduce_transcript(transcript: &str, limit: usize) -> String {
    if char_len(transcript) <= limit {
        return transcript.to_string();
    }

    let raw = split_sentences(transcript);
    let sentences: Vec<&str> = raw.iter().map(|s| s.trim()).collect();

    let head = &sentences[..sentences.len().min(EDGE_SENTENCES)];
    let tail = &sentences[sentences.len().saturating_sub(EDGE_SENTENCES)..];

    let mut important: Vec<(usize, &str)> = Vec::new();
    let mut regular: Vec<&str> = Vec::new();
    for sentence in sentences.iter().copied().filter(|s| !s.is_empty()) {
        match importance_score(sentence) {
            0 => regular.push(sentence),
            score => important.push((score, sentence)),
        }
    }
    important.sort_by(|a, b| b.0.cmp(&a.0));

    let step = (regular.len() / MAX_REGULAR).max(1);
    let middle = important
        .iter()
        .take(MAX_IMPORTANT)
        .map(|(_, sentence)| *sentence)
        .chain(regular.iter().step_by(step).take(MAX_REGULAR).copied());

    let mut admitted: Vec<&str> = Vec::new();
    for candidate in middle {
        admitted.push(candidate);
        let joined = join_unique(
            head.iter()
                .chain(admitted.iter())
                .chain(tail.iter())
                .copied(),
        );
        if char_len(&joined) > limit {
            admitted.pop();
        }
    }

    let reduced = join_unique(
        head.iter()
            .chain(admitted.iter())
            .chain(tail.iter())
            .copied(),
    );
    truncate_with_marker(&reduced, limit)
}

pub struct SummarizeStage {
    model: Arc<dyn LanguageModel>,
    progress: Arc<dyn ProgressSink>,
    config: PipelineConfig,
}

impl SummarizeStage {
    pub const NAME: &'static str = "summarize";

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

    async fn summarize(&self, processed: &str) -> Result<String, ModelError> {
        let prompt = Prompt::new(
            SUMMARY_PROMPT,
            format!("Here is the YouTube caption to summarize:\n\n{}", processed),
        );
        let summary = self.model.generate(&prompt).await?.trim().to_string();

        if char_len(&summary) >= self.config.min_summary_chars {
            return Ok(summary);
        }

        warn!(
            length = char_len(&summary),
            min = self.config.min_summary_chars,
            "Summary too short, requesting elaboration"
        );
        let follow_up = Prompt::new(
            ELABORATE_PROMPT,
            format!(
                "Original caption:\n{}\n\nInitial summary:\n{}\n\nPlease elaborate further.",
                processed, summary
            ),
        );
        Ok(self.model.generate(&follow_up).await?.trim().to_string())
    }
}

#[async_trait]
impl Stage for SummarizeStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: PipelineState) -> anyhow::Result<PipelineState> {
        report_progress(
            self.progress.as_ref(),
            state.job_id(),
            40,
            "Summarizing the transcript...",
        )
        .await;

        if !is_usable_transcript(state.transcript()) {
            warn!("No usable transcript, skipping summarization");
            return Ok(state.with_summary(NO_VALID_TRANSCRIPT_SUMMARY.to_string()));
        }

        let processed = reduce_transcript(state.transcript(), self.config.transcript_char_limit);
        info!(
            original = char_len(state.transcript()),
            processed = char_len(&processed),
            "Transcript prepared for summarization"
        );

        let summary = match self.summarize(&processed).await {
            Ok(summary) => {
                info!(length = char_len(&summary), "Summary generated");
                summary
            }
            Err(e) => {
                error!("Summary generation failed: {}", e);
                format!("Error during summary generation: {}", e)
            }
        };

        Ok(state.with_summary(summary))
    }
}
