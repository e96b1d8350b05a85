//! # Ollama Provider
//!
//! Native Ollama chat API (`/api/chat`). Images ride along as a base64 list
//! on the message; JSON mode maps to `format: "json"`.

use crate::{GenerateOptions, LlmProvider, Message, ProviderError, Response, Result, Usage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Ollama provider
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    default_model: String,
}

impl OllamaProvider {
    /// Provider for a local Ollama on the default port
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "http://localhost:11434".to_string(),
            default_model: "llama3:8b".to_string(),
        }
    }

    /// Create with a custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the request timeout (local inference can be slow)
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
                images: m.images.clone(),
            })
            .collect()
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn chat(&self, messages: &[Message], options: &GenerateOptions) -> Result<Response> {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        debug!("Ollama chat with model: {}", model);

        let request = OllamaChatRequest {
            model: model.clone(),
            messages: self.convert_messages(messages),
            stream: false,
            format: options.json_mode.then(|| "json".to_string()),
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens.map(|t| t as i32),
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            });
        }

        let chat_response: OllamaChatResponse = response.json().await?;
        let prompt_tokens = chat_response.prompt_eval_count.unwrap_or(0);
        let completion_tokens = chat_response.eval_count.unwrap_or(0);

        Ok(Response {
            content: chat_response.message.content.trim().to_string(),
            model,
            finish_reason: chat_response.done_reason,
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }
}

// Ollama types

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    done_reason: Option<String>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_ollama_defaults() {
        let provider = OllamaProvider::new();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.base_url, "http://localhost:11434");
        assert_eq!(provider.default_model(), "llama3:8b");
    }

    #[tokio::test]
    async fn test_chat_sends_images_and_format() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "model": "qwen2.5vl:7b",
                "stream": false,
                "format": "json",
                "messages": [{"role": "user", "content": "look", "images": ["AAAA"]}]
            })))
            .with_status(200)
            .with_body(r#"{"message": {"role": "assistant", "content": " {\"validated\": true} "}, "done_reason": "stop", "eval_count": 4}"#)
            .create_async()
            .await;

        let provider = OllamaProvider::new().with_base_url(server.url());
        let options = GenerateOptions::default().with_model("qwen2.5vl:7b").json();
        let response = provider
            .chat(&[Message::user("look").with_image("AAAA")], &options)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "{\"validated\": true}");
        assert_eq!(response.usage.unwrap().total_tokens, 4);
    }

    #[tokio::test]
    async fn test_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(404)
            .with_body("model not found")
            .create_async()
            .await;

        let provider = OllamaProvider::new().with_base_url(server.url());
        let err = provider
            .chat(&[Message::user("hi")], &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status: 404, .. }));
    }
}
