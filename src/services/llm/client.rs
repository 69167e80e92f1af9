use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::PlannerError;

/// Thin client for an Ollama-compatible host (`/api/tags`, `/api/chat`).
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

/// Result of asking the host whether a model is pulled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelAvailability {
    Present,
    Absent,
    Unreachable(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
    pub num_ctx: u32,
    pub num_thread: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
    pub keep_alive: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatReply>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Adds a scheme when missing and drops trailing slashes.
pub fn normalize_host(host: &str) -> String {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

impl OllamaClient {
    pub fn new(host: &str) -> Self {
        Self {
            client: Client::builder().build().unwrap_or_else(|_| Client::new()),
            base_url: normalize_host(host),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_models(&self, timeout: Duration) -> Result<Vec<String>, PlannerError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlannerError::Status(response.status().as_u16()));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    pub async fn probe_model(&self, model: &str, timeout: Duration) -> ModelAvailability {
        match self.list_models(timeout).await {
            Ok(names) => {
                let tagged = format!("{}:latest", model);
                if names.iter().any(|n| n == model || (!model.contains(':') && *n == tagged)) {
                    ModelAvailability::Present
                } else {
                    ModelAvailability::Absent
                }
            }
            Err(e) => ModelAvailability::Unreachable(e.to_string()),
        }
    }

    /// One non-streaming chat round trip. Returns the assistant content as sent.
    pub async fn chat(&self, request: &ChatRequest, timeout: Duration) -> Result<String, PlannerError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(timeout)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlannerError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let envelope: ChatResponse =
            serde_json::from_str(&body).map_err(|e| PlannerError::Envelope(e.to_string()))?;

        let content = envelope.message.map(|m| m.content).unwrap_or_default();
        debug!("chat reply from {}: {} chars", request.model, content.len());
        Ok(content)
    }
}
