/// Thresholds shared by the pipeline stages and the job service.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Transcripts longer than this (in chars) are reduced before summarization.
    pub transcript_char_limit: usize,
    /// Summaries shorter than this trigger one elaboration request.
    pub min_summary_chars: usize,
    /// Summaries shorter than this skip visualization entirely.
    pub min_visualization_summary_chars: usize,
    pub visualization_title_chars: usize,
    pub report_title_chars: usize,
    /// Fallback sectioning keeps only paragraphs longer than this.
    pub fallback_paragraph_min_chars: usize,
    /// Narration input is capped at this many chars.
    pub narration_char_budget: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transcript_char_limit: 6000,
            min_summary_chars: 500,
            min_visualization_summary_chars: 100,
            visualization_title_chars: 50,
            report_title_chars: 100,
            fallback_paragraph_min_chars: 50,
            narration_char_budget: 2500,
        }
    }
}

impl PipelineConfig {
    pub fn with_transcript_char_limit(mut self, limit: usize) -> Self {
        self.transcript_char_limit = limit;
        self
    }

    pub fn with_min_summary_chars(mut self, chars: usize) -> Self {
        self.min_summary_chars = chars;
        self
    }

    pub fn with_narration_char_budget(mut self, chars: usize) -> Self {
        self.narration_char_budget = chars;
        self
    }
}
