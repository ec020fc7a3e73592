//! Model service abstraction and the Ollama implementation.

pub mod ollama;

use serde::Serialize;
use shared::ChatMessage;

pub use ollama::OllamaClient;

/// Runtime hints passed to the model service with every call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ModelOptions {
    /// Number of layers to offload to the GPU. `Some(0)` forces CPU.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_gpu: Option<u32>,
    /// CPU threads to use when running without GPU offload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<usize>,
}

/// One non-streaming chat invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: ModelOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,
    #[error("could not connect to model service: {0}")]
    Connection(String),
    #[error("model service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ServiceError::Timeout
        } else if e.is_connect() {
            ServiceError::Connection(e.to_string())
        } else if e.is_decode() {
            ServiceError::Decode(e.to_string())
        } else {
            ServiceError::Other(e.to_string())
        }
    }
}

/// A chat-capable model backend.
///
/// Implementations are stateless per call, so one instance can be shared by
/// every session.
#[async_trait::async_trait]
pub trait ModelService: Send + Sync {
    /// Run one call and return the reply text.
    async fn chat(&self, request: &ChatRequest) -> Result<String, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_skip_unset_fields() {
        let gpu = ModelOptions {
            num_gpu: Some(99),
            num_thread: None,
        };
        assert_eq!(serde_json::to_string(&gpu).unwrap(), r#"{"num_gpu":99}"#);

        let cpu = ModelOptions {
            num_gpu: Some(0),
            num_thread: Some(6),
        };
        assert_eq!(
            serde_json::to_string(&cpu).unwrap(),
            r#"{"num_gpu":0,"num_thread":6}"#
        );
    }

    #[test]
    fn test_status_error_message() {
        let err = ServiceError::Status {
            status: 404,
            message: "model 'nope' not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "model service returned 404: model 'nope' not found"
        );
    }
}
