//! Chat completion client
//!
//! Thin wrapper over an OpenAI-compatible chat completions endpoint.
//! The base URL is injectable so tests can point at a local mock server.

use serde::{Deserialize, Serialize};

/// Configuration for the completion backend
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// A single chat message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Request(String),
    #[error("Completion backend returned status {0}")]
    Status(u16),
    #[error("Completion backend returned no choices")]
    Empty,
}

/// Client for the chat completion backend
#[derive(Clone)]
pub struct CompletionClient {
    client: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Request a completion for the given conversation
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatMessage, CompletionError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                "Completion backend returned error"
            );
            return Err(CompletionError::Status(status.as_u16()));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(CompletionError::Empty)
    }
}
