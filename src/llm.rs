use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Settings;
use crate::embeddings::{endpoint, http_client};
use crate::error::{RagError, Result};

pub trait LanguageModel {
    /// Generated text for `prompt`, returned as the model produced it.
    fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat model served by a local Ollama instance (`/api/chat`, non-streaming).
pub struct OllamaChat {
    client: Client,
    url: String,
    model: String,
    temperature: Option<f32>,
}

impl OllamaChat {
    pub fn new(base_url: &str, model: &str, timeout_secs: Option<u64>) -> Result<Self> {
        info!("Using Ollama chat model: model={}, url={}", model, base_url);
        Ok(Self {
            client: http_client(timeout_secs)?,
            url: endpoint(base_url, "api/chat"),
            model: model.to_string(),
            temperature: None,
        })
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            &settings.llm_url,
            &settings.chat_model,
            settings.request_timeout_secs,
        )?
        .with_temperature(settings.temperature))
    }
}

impl LanguageModel for OllamaChat {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Sending {} character prompt to {}", prompt.len(), self.model);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: self.temperature.map(|t| ChatOptions {
                temperature: Some(t),
            }),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .map_err(|e| RagError::Generation(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RagError::Generation(format!("{} returned {}: {}", self.url, status, body)));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| RagError::Generation(format!("malformed response: {}", e)))?;
        Ok(parsed.message.content)
    }
}
