#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use vidreport_core::{
    ModelError, NarrationError, PipelineDeps, ProgressError, StorageError, TranscriptError,
    services::{
        LanguageModel, MemoryTextStorage, Narration, NarrationProvider, ProgressSink, Prompt,
        TextStorage, TranscriptProvider,
    },
};

pub const SUMMARY: &str = "summarizes YouTube video captions";
pub const ELABORATE: &str = "too short";
pub const CONTEXT: &str = "visualization opportunities";
pub const VISUAL: &str = "single visualization";
pub const STRUCTURE: &str = "structured sections";

/// Replies picked by a fragment of the system prompt, in queue order per fragment.
#[derive(Default)]
pub struct ScriptedModel {
    routes: Mutex<Vec<(&'static str, VecDeque<String>)>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, system_fragment: &'static str, reply: impl Into<String>) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            match routes.iter_mut().find(|(fragment, _)| *fragment == system_fragment) {
                Some((_, replies)) => replies.push_back(reply.into()),
                None => routes.push((system_fragment, VecDeque::from([reply.into()]))),
            }
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, system_fragment: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|prompt| prompt.system.contains(system_fragment))
            .count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let mut routes = self.routes.lock().unwrap();
        routes
            .iter_mut()
            .find(|(fragment, _)| prompt.system.contains(*fragment))
            .and_then(|(_, replies)| replies.pop_front())
            .ok_or(ModelError::EmptyResponse)
    }
}

/// Storage whose writes always fail; counts the attempts.
#[derive(Default)]
pub struct FailingStorage {
    pub puts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextStorage for FailingStorage {
    async fn put(&self, key: &str, _text: &str) -> Result<(), StorageError> {
        self.puts.lock().unwrap().push(key.to_string());
        Err(StorageError::InvalidKey {
            key: key.to_string(),
        })
    }

    async fn get(&self, key: &str) -> Result<String, StorageError> {
        Err(StorageError::NotFound {
            key: key.to_string(),
        })
    }
}

pub struct StaticTranscripts(pub Result<String, String>);

#[async_trait]
impl TranscriptProvider for StaticTranscripts {
    async fn fetch(&self, url: &str) -> Result<String, TranscriptError> {
        self.0
            .clone()
            .map_err(|reason| TranscriptError::RequestFailed {
                url: url.to_string(),
                reason,
            })
    }
}

#[derive(Default)]
pub struct RecordingProgress(Mutex<Vec<(i32, String)>>);

impl RecordingProgress {
    pub fn percents(&self) -> Vec<i32> {
        self.0.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn report(&self, _job_id: &str, percent: i32, message: &str) -> Result<(), ProgressError> {
        self.0.lock().unwrap().push((percent, message.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNarration(pub Mutex<Vec<String>>);

#[async_trait]
impl NarrationProvider for RecordingNarration {
    async fn narrate(&self, job_id: &str, text: &str) -> Result<Narration, NarrationError> {
        self.0.lock().unwrap().push(text.to_string());
        Ok(Narration {
            storage_key: format!("audio/{}.mp3", job_id),
            duration_estimate_secs: text.len() as f64 / 200.0,
        })
    }
}

pub fn deps(
    transcript: Result<&str, &str>,
    model: Arc<ScriptedModel>,
    storage: Arc<MemoryTextStorage>,
    progress: Arc<RecordingProgress>,
) -> PipelineDeps {
    PipelineDeps {
        transcripts: Arc::new(StaticTranscripts(
            transcript.map(str::to_string).map_err(str::to_string),
        )),
        storage,
        model,
        progress,
    }
}

/// Five paragraphs, well over the elaboration threshold.
pub fn long_summary() -> String {
    [
        "Overview of a talk on scaling a small software company through its first three years.",
        "Revenue grew from 1M to 4M while the team doubled, driven mostly by enterprise contracts and a new pricing model.",
        "The key result was that churn dropped by half after onboarding was redesigned around guided setup sessions.",
        "The speaker closes with recommendations: invest in support early, measure activation weekly, and keep pricing simple enough to explain in one sentence. The main finding is that retention beats acquisition.",
        "A short question and answer segment follows, covering hiring, remote work, and how the founders split responsibilities between product and sales as the company matured.",
    ]
    .join("\n\n")
}
