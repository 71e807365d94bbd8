//! Collaborators the pipeline talks to. Each is a trait object so tests and
//! alternative backends can be swapped in at construction time.

pub mod jobs;
pub mod metadata;
pub mod model;
pub mod narration;
pub mod progress;
pub mod storage;
pub mod transcript;

pub use jobs::{JobOutcome, JobRecord, JobStatus, JobStore, MemoryJobStore};
pub use metadata::{MetadataProvider, VideoMetadata, YtDlpMetadata};
pub use model::{ChatModel, LanguageModel, Prompt};
pub use narration::{Narration, NarrationProvider};
pub use progress::{NoopProgress, ProgressSink, report_progress};
pub use storage::{FsTextStorage, MemoryTextStorage, TextStorage};
pub use transcript::{TranscriptProvider, VidcapTranscripts, YtDlpTranscripts};
