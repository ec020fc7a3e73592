use crate::{ChatRequest, ModelOptions, ModelService, ServiceError};
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::ChatMessage;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: &'a ModelOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
    /// Base64-encoded image payloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaReply>,
}

#[derive(Debug, Deserialize)]
struct OllamaReply {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorBody {
    error: String,
}

impl<'a> OllamaMessage<'a> {
    fn from_chat(message: &'a ChatMessage) -> Self {
        let images = if message.has_images() {
            let engine = base64::engine::general_purpose::STANDARD;
            Some(message.images.iter().map(|img| engine.encode(img)).collect())
        } else {
            None
        };
        Self {
            role: message.role.as_str(),
            content: &message.content,
            images,
        }
    }
}

fn build_body(request: &ChatRequest) -> OllamaChatRequest<'_> {
    OllamaChatRequest {
        model: &request.model,
        messages: request.messages.iter().map(OllamaMessage::from_chat).collect(),
        stream: false,
        options: &request.options,
    }
}

/// Pull the human-readable reason out of an Ollama error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<OllamaErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Non-streaming client for a local Ollama server.
pub struct OllamaClient {
    http: Client,
    base: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| ServiceError::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }
}

#[async_trait::async_trait]
impl ModelService for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String, ServiceError> {
        let url = format!("{}/api/chat", self.base);
        let body = build_body(request);
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "POST {}",
            url
        );

        let resp = self.http.post(url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let parsed: OllamaChatResponse = resp.json().await?;
        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }
}
