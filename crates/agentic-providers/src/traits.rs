//! # Provider Traits
//!
//! The trait every chat backend implements.

use crate::{Message, Result};
use async_trait::async_trait;

/// Response from an LLM
#[derive(Debug, Clone)]
pub struct Response {
    /// The generated content
    pub content: String,
    /// Model used
    pub model: String,
    /// Finish reason (stop, length, etc)
    pub finish_reason: Option<String>,
    /// Token usage
    pub usage: Option<Usage>,
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Options for generation
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Model to use (None = provider default)
    pub model: Option<String>,
    /// Temperature (0.0-2.0)
    pub temperature: Option<f32>,
    /// Max tokens to generate
    pub max_tokens: Option<u32>,
    /// Ask the backend for a JSON object
    pub json_mode: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: Some(0.2),
            max_tokens: Some(2048),
            json_mode: false,
        }
    }
}

impl GenerateOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Core LLM provider trait
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "ollama")
    fn name(&self) -> &str;

    /// Get the default model for this provider
    fn default_model(&self) -> &str;

    /// Generate a response (non-streaming)
    async fn chat(&self, messages: &[Message], options: &GenerateOptions) -> Result<Response>;

    /// Simple generate with just system and user prompts
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let messages = vec![Message::system(system), Message::user(user)];
        let response = self.chat(&messages, &GenerateOptions::default()).await?;
        Ok(response.content)
    }
}
