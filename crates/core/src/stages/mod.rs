pub mod assemble;
pub mod finalize;
pub mod summarize;
pub mod transcript;
pub mod visualize;

use async_trait::async_trait;

use crate::state::PipelineState;

pub use assemble::AssembleStage;
pub use finalize::FinalizeStage;
pub use summarize::SummarizeStage;
pub use transcript::TranscriptStage;
pub use visualize::VisualizeStage;

/// One step of the analysis pipeline.
///
/// Expected failures (unavailable transcript, model errors, unparsable model
/// output) degrade the produced field in place. `Err` is reserved for
/// failures the stage cannot contain.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, state: PipelineState) -> anyhow::Result<PipelineState>;
}
