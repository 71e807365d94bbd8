use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Transcript request failed for {url}: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("yt-dlp failed for {url}: {reason}")]
    YtDlpFailed { url: String, reason: String },

    #[error("No subtitles available for {url}")]
    NoSubtitles { url: String },

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Missing API key for {provider_name}")]
    MissingApiKey { provider_name: String },

    #[error("Invalid API response: {0}")]
    InvalidResponse(serde_json::Value),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage key: {key}")]
    InvalidKey { key: String },

    #[error("No object stored under {key}")]
    NotFound { key: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Unknown job {job_id}")]
    UnknownJob { job_id: String },

    #[error("Progress sink unavailable: {reason}")]
    Unavailable { reason: String },
}

#[derive(Error, Debug)]
pub enum JobStoreError {
    #[error("Job {job_id} already exists")]
    Duplicate { job_id: String },

    #[error("Unknown job {job_id}")]
    UnknownJob { job_id: String },
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata lookup failed for {url}: {reason}")]
    LookupFailed { url: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum NarrationError {
    #[error("Narration failed: {reason}")]
    Failed { reason: String },
}

/// Failure to recover a JSON object from free-form model output.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No JSON object delimiters found in model output")]
    NoObject,

    #[error("Embedded JSON is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Embedded JSON is not an object")]
    NotAnObject,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job store error: {0}")]
    JobStore(#[from] JobStoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}
