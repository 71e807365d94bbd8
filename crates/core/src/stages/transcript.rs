use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::{
    cache::transcript_key,
    services::{ProgressSink, TextStorage, TranscriptProvider, report_progress},
    stages::Stage,
    state::PipelineState,
    text::char_len,
};

/// Prefix of the transcript placeholder written when fetching fails.
pub const TRANSCRIPT_FAILED_PREFIX: &str = "Transcript extraction failed";
pub const TRANSCRIPT_NOT_FOUND: &str = "Transcript not found.";

/// False for empty transcripts and for the placeholders this stage writes on failure.
pub fn is_usable_transcript(transcript: &str) -> bool {
    let trimmed = transcript.trim();
    !trimmed.is_empty()
        && trimmed != TRANSCRIPT_NOT_FOUND
        && !trimmed.contains(TRANSCRIPT_FAILED_PREFIX)
}

pub struct TranscriptStage {
    transcripts: Arc<dyn TranscriptProvider>,
    storage: Arc<dyn TextStorage>,
    progress: Arc<dyn ProgressSink>,
}

impl TranscriptStage {
    pub const NAME: &'static str = "transcript";

    pub fn new(
        transcripts: Arc<dyn TranscriptProvider>,
        storage: Arc<dyn TextStorage>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            transcripts,
            storage,
            progress,
        }
    }

    async fn persist(&self, state: &PipelineState, transcript: &str) {
        if state.job_id().is_empty() || state.user_id().is_empty() {
            return;
        }
        let key = transcript_key(state.user_id(), state.job_id());
        match self.storage.put(&key, transcript).await {
            Ok(()) => info!(key, "Transcript stored"),
            Err(e) => warn!(key, "Failed to store transcript (ignored): {}", e),
        }
    }
}

#[async_trait]
impl Stage for TranscriptStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, state: PipelineState) -> anyhow::Result<PipelineState> {
        report_progress(
            self.progress.as_ref(),
            state.job_id(),
            20,
            "Extracting transcript...",
        )
        .await;
        info!(url = state.source_url(), "Transcript extraction started");

        let transcript = match self.transcripts.fetch(state.source_url()).await {
            Ok(text) if text.trim().is_empty() => {
                warn!(url = state.source_url(), "Provider returned an empty transcript");
                TRANSCRIPT_NOT_FOUND.to_string()
            }
            Ok(text) => {
                self.persist(&state, &text).await;
                text
            }
            Err(e) => {
                let message = format!("{}: {}", TRANSCRIPT_FAILED_PREFIX, e);
                error!("{}", message);
                message
            }
        };

        info!(length = char_len(&transcript), "Transcript extraction completed");
        Ok(state.with_transcript(transcript))
    }
}
