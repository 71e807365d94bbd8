pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod pipeline;
pub mod provider;
pub mod service;
pub mod services;
pub mod stages;
pub mod state;
pub mod text;
pub mod types;

pub use cache::{get_root_cache_dir, get_storage_dir, report_key, transcript_key};
pub use config::PipelineConfig;
pub use error::{
    ExtractError, JobStoreError, MetadataError, ModelError, NarrationError, ProgressError,
    ServiceError, StorageError, TranscriptError,
};
pub use format::format_report_readable;
pub use pipeline::{Pipeline, PipelineDeps};
pub use provider::{Provider, ProviderConfig};
pub use service::{AnalysisRequest, ProcessOutcome, ReportService, SubmittedJob};
pub use state::PipelineState;
pub use types::{
    FinalOutput, InsertionPosition, ProcessInfo, ReportMetadata, ReportResult, ReportSection,
    SectionEntry, Statistics, TextSection, VisualSection, VisualizationCandidate,
    VisualizationKind,
};
