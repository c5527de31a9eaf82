
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::OllamaConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Client for the Ollama HTTP API, covering both the embedding and the
/// generation collaborator roles.
///
/// Calls are blocking and single-attempt: a failed request is surfaced to
/// the caller once, never retried.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    agent: ureq::Agent,
}

/// Generation failures, classified so callers can give the "model not
/// installed" case an actionable message.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("model '{model}' was not found on the Ollama server")]
    ModelNotFound { model: String },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// One turn of a chat exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn user(content: String) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .url()
            .context("Failed to build Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn generation_model(&self) -> &str {
        &self.generation_model
    }

    /// Generate an embedding vector for a single text.
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let url = self
            .base_url
            .join("/api/embeddings")
            .context("Failed to build embedding URL")?;

        let request = EmbedRequest {
            model: &self.embedding_model,
            prompt: text,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| anyhow!("Embedding request failed: {e}"))?;

        let response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        debug!("Generated embedding with {} dimensions", response.embedding.len());
        Ok(response.embedding)
    }

    /// Run a non-streaming chat completion with the generation model.
    #[inline]
    pub fn chat(&self, messages: &[ChatMessage]) -> Result<String, GenerateError> {
        debug!(
            "Requesting chat completion with model {} ({} messages)",
            self.generation_model,
            messages.len()
        );

        let url = self
            .base_url
            .join("/api/chat")
            .context("Failed to build chat URL")?;

        let request = ChatRequest {
            model: &self.generation_model,
            messages,
            stream: false,
        };
        let request_json = serde_json::to_string(&request)
            .context("Failed to serialize chat request")
            .map_err(GenerateError::Other)?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| self.classify_chat_error(&e))?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .context("Failed to parse chat response")
            .map_err(GenerateError::Other)?;

        Ok(response.message.content)
    }

    /// Ollama answers a chat request for an uninstalled model with 404;
    /// everything else is an opaque transport or server failure.
    fn classify_chat_error(&self, error: &ureq::Error) -> GenerateError {
        match error {
            ureq::Error::StatusCode(404) => GenerateError::ModelNotFound {
                model: self.generation_model.clone(),
            },
            other => GenerateError::Other(anyhow!("Chat request failed: {other}")),
        }
    }
}
