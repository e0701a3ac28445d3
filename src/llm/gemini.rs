//! Google Gemini `generateContent` client.

use super::{send_error, ModelClient, ModelError};
use crate::config::ModelConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        Some(
            candidate
                .content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect(),
        )
    }
}

/// Client for the hosted Gemini API.
pub struct GeminiClient {
    base_url: String,
    model_name: String,
    api_key: Option<String>,
    temperature: f32,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client from the model settings.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.gemini_url.trim_end_matches('/').to_string(),
            model_name: config.name.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model_name
        )
    }

    /// The key travels in a header so it never appears in request URLs.
    fn request(&self, prompt: &str, api_key: &str) -> reqwest::RequestBuilder {
        self.http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&self.build_request(prompt))
    }

    fn build_request(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ModelError::MissingApiKey)?;

        debug!("Sending {} byte prompt to {}", prompt.len(), self.endpoint());

        let response = self
            .request(prompt, api_key)
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

        let generated: GenerateResponse = response.json().await?;

        generated
            .text()
            .ok_or_else(|| ModelError::Parse("response contained no candidates".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelProvider;

    fn gemini_config(api_key: Option<&str>) -> ModelConfig {
        ModelConfig {
            provider: ModelProvider::Gemini,
            name: "gemini-2.0-flash-lite".to_string(),
            api_key: api_key.map(String::from),
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(&gemini_config(Some("k"))).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-lite:generateContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let client = GeminiClient::new(&gemini_config(Some("k"))).unwrap();
        let json = serde_json::to_value(client.build_request("hello")).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert!(json["generationConfig"]["temperature"].as_f64().is_some());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"score\": "},{"text":"6}"}],"role":"model"}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("{\"score\": 6}"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = GeminiClient::new(&gemini_config(Some(""))).unwrap();
        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, ModelError::MissingApiKey));
    }

    #[test]
    fn test_api_key_sent_as_header() {
        let client = GeminiClient::new(&gemini_config(Some("SECRETKEY123"))).unwrap();
        let request = client.request("hello", "SECRETKEY123").build().unwrap();

        assert_eq!(request.headers()[API_KEY_HEADER], "SECRETKEY123");
        assert!(request.url().query().is_none());
        assert!(!request.url().as_str().contains("SECRETKEY123"));
    }

    #[tokio::test]
    async fn test_dropped_connection_error_hides_api_key() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let config = ModelConfig {
            gemini_url: format!("http://{}", addr),
            timeout_seconds: 5,
            ..gemini_config(Some("SECRETKEY123"))
        };
        let client = GeminiClient::new(&config).unwrap();

        let err = client.complete("hello").await.unwrap_err();

        assert!(!err.to_string().contains("SECRETKEY123"), "leaked: {}", err);
    }
}
