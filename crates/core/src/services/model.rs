use async_trait::async_trait;

use crate::{error::ModelError, provider::Provider};

/// A single system + user exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Opaque text-in, text-out model. Call sites decide their own retry policy.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError>;
}

/// OpenAI-compatible chat completions client.
pub struct ChatModel {
    provider: Provider,
    api_key: String,
    temperature: f32,
    client: reqwest::Client,
}

impl ChatModel {
    pub fn new(provider: Provider) -> Result<Self, ModelError> {
        let api_key = provider.validate_api_key()?;
        Ok(Self {
            provider,
            api_key,
            temperature: 0.3,
            client: reqwest::Client::new(),
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

#[async_trait]
impl LanguageModel for ChatModel {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let config = self.provider.config();

        let response = self
            .client
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": config.model,
                "messages": [
                    {
                        "role": "system",
                        "content": &prompt.system,
                    },
                    {
                        "role": "user",
                        "content": &prompt.user,
                    },
                ],
                "temperature": self.temperature,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ModelError::InvalidResponse(response.clone()))?
            .trim();

        if content.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}
