use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NarrationError;

/// Where a narrated brief was stored and roughly how long it plays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Narration {
    pub storage_key: String,
    pub duration_estimate_secs: f64,
}

/// Text-to-speech backend. Synthesis and audio storage live behind this trait.
#[async_trait]
pub trait NarrationProvider: Send + Sync {
    async fn narrate(&self, job_id: &str, text: &str) -> Result<Narration, NarrationError>;
}
