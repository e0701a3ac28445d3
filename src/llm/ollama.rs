//! Ollama chat API client.

use super::{send_error, ModelClient, ModelError};
use crate::config::ModelConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Client for a local or remote Ollama server.
pub struct OllamaClient {
    base_url: String,
    model_name: String,
    temperature: f32,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client from the model settings.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model_name: config.name.clone(),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
            http_client,
        })
    }

    fn build_request(&self, prompt: &str) -> OllamaChatRequest<'_> {
        OllamaChatRequest {
            model: &self.model_name,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = self.build_request(prompt);

        debug!("Sending {} byte prompt to {}", prompt.len(), url);

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(e, &self.base_url, self.timeout_seconds))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let chat_response: OllamaChatResponse = response.json().await?;

        Ok(chat_response.message.content)
    }
}
