use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{fs, process::Command};
use tracing::debug;

use crate::{
    cache::{find_subtitles_in_cache, get_cache_dir},
    error::TranscriptError,
};

/// Fetches the transcript text for a video reference.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, TranscriptError>;
}

const VIDCAP_API_URL: &str = "https://vidcap.xyz/api/v1/youtube/caption";
const VIDCAP_ENV_VAR: &str = "VIDCAP_API_KEY";

/// Caption API at vidcap.xyz.
pub struct VidcapTranscripts {
    api_key: String,
    locale: String,
    client: reqwest::Client,
}

impl VidcapTranscripts {
    pub fn new(api_key: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            locale: locale.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env(locale: impl Into<String>) -> Result<Self, TranscriptError> {
        let api_key = std::env::var(VIDCAP_ENV_VAR).map_err(|_| TranscriptError::MissingApiKey {
            env_var: VIDCAP_ENV_VAR.to_string(),
        })?;
        Ok(Self::new(api_key, locale))
    }
}

#[async_trait]
impl TranscriptProvider for VidcapTranscripts {
    async fn fetch(&self, url: &str) -> Result<String, TranscriptError> {
        let response = self
            .client
            .get(VIDCAP_API_URL)
            .query(&[("url", url), ("locale", self.locale.as_str())])
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TranscriptError::RequestFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body = response.json::<serde_json::Value>().await?;
        Ok(body["data"]["content"].as_str().unwrap_or_default().to_string())
    }
}

/// Subtitles (uploaded or automatic) downloaded with yt-dlp, cached per URL.
pub struct YtDlpTranscripts {
    lang: String,
    force: bool,
}

impl YtDlpTranscripts {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            force: false,
        }
    }

    /// Ignore subtitles already in the cache
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    async fn download_subtitles(&self, url: &str, cache_dir: &Path) -> Result<(), TranscriptError> {
        let output_template = cache_dir.join("subs.%(ext)s");
        let output = Command::new("yt-dlp")
            .arg(url)
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs")
            .arg(&self.lang)
            .arg("--sub-format")
            .arg("json3")
            .arg("--extractor-args")
            .arg("youtube:player_client=android,web")
            .arg("-o")
            .arg(&output_template)
            .output()
            .await?;

        if !output.status.success() {
            return Err(TranscriptError::YtDlpFailed {
                url: url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TranscriptProvider for YtDlpTranscripts {
    async fn fetch(&self, url: &str) -> Result<String, TranscriptError> {
        let cache_dir = get_cache_dir(url);
        fs::create_dir_all(&cache_dir).await?;

        let cached = if self.force {
            None
        } else {
            find_subtitles_in_cache(&cache_dir)
        };

        let subtitles_path = match cached {
            Some(path) => {
                debug!(path = %path.display(), "Using cached subtitles");
                path
            }
            None => {
                self.download_subtitles(url, &cache_dir).await?;
                find_subtitles_in_cache(&cache_dir).ok_or_else(|| TranscriptError::NoSubtitles {
                    url: url.to_string(),
                })?
            }
        };

        let json_content = fs::read_to_string(&subtitles_path).await?;
        parse_json3(&json_content)
    }
}

#[derive(Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Deserialize)]
struct Json3Event {
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Flatten a YouTube json3 subtitle track into one line per caption event.
pub fn parse_json3(json_content: &str) -> Result<String, TranscriptError> {
    let track: Json3 = serde_json::from_str(json_content)?;

    let lines: Vec<String> = track
        .events
        .iter()
        .map(|event| {
            event
                .segs
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>()
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect();

    Ok(lines.join("\n"))
}
