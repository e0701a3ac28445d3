//! Text-understanding model clients.
//!
//! Scoring and summarization only need "prompt in, completion out", so every
//! backend sits behind [`ModelClient`] and is handed to the analysis
//! components explicitly.

pub mod gemini;
pub mod ollama;

#[cfg(test)]
pub mod scripted;

use crate::config::{ModelConfig, ModelProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

/// Errors raised while invoking a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport-level failure (DNS, TLS, broken connection).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service could not be reached at all.
    #[error("cannot connect to model service at {0}")]
    Connect(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The service answered with a non-success status.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response envelope could not be decoded.
    #[error("failed to parse model response: {0}")]
    Parse(String),

    /// The provider needs an API key and none was configured.
    #[error("no API key configured")]
    MissingApiKey,
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_decode() {
            ModelError::Parse(err.to_string())
        } else {
            ModelError::Http(err.to_string())
        }
    }
}

/// A text-understanding model: one prompt in, one completion out.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Model identifier, for logs and report metadata.
    fn model_name(&self) -> &str;

    /// Sends a single prompt and returns the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Builds the configured model client.
pub fn build_model_client(config: &ModelConfig) -> anyhow::Result<Arc<dyn ModelClient>> {
    let client: Arc<dyn ModelClient> = match config.provider {
        ModelProvider::Ollama => Arc::new(OllamaClient::new(config)?),
        ModelProvider::Gemini => Arc::new(GeminiClient::new(config)?),
    };
    Ok(client)
}

/// Maps a reqwest send error to a [`ModelError`], naming the endpoint.
///
/// The request URL is dropped from the message; it may carry credentials.
pub(crate) fn send_error(err: reqwest::Error, base_url: &str, timeout_seconds: u64) -> ModelError {
    let err = err.without_url();
    if err.is_timeout() {
        ModelError::Timeout(timeout_seconds)
    } else if err.is_connect() {
        ModelError::Connect(base_url.to_string())
    } else {
        ModelError::Http(err.to_string())
    }
}
