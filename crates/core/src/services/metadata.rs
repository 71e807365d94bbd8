use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::MetadataError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub duration_seconds: f64,
    pub thumbnail: String,
}

/// Looks up descriptive metadata for the source video.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn lookup(&self, url: &str) -> Result<VideoMetadata, MetadataError>;
}

/// Reads metadata from `yt-dlp --dump-json`.
pub struct YtDlpMetadata;

#[async_trait]
impl MetadataProvider for YtDlpMetadata {
    async fn lookup(&self, url: &str) -> Result<VideoMetadata, MetadataError> {
        let output = Command::new("yt-dlp")
            .arg(url)
            .arg("--dump-json")
            .arg("--skip-download")
            .arg("--no-playlist")
            .output()
            .await?;

        if !output.status.success() {
            return Err(MetadataError::LookupFailed {
                url: url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let info: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        Ok(parse_info(&info))
    }
}

fn parse_info(info: &serde_json::Value) -> VideoMetadata {
    let text = |key: &str| info[key].as_str().unwrap_or_default().to_string();
    let channel = info["channel"]
        .as_str()
        .or_else(|| info["uploader"].as_str())
        .unwrap_or_default()
        .to_string();

    VideoMetadata {
        video_id: text("id"),
        title: text("title"),
        channel,
        duration_seconds: info["duration"].as_f64().unwrap_or(0.0),
        thumbnail: text("thumbnail"),
    }
}
