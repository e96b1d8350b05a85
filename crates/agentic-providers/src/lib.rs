//! # Agentic Providers
//!
//! Model backends for the vision and reasoning calls of the agent loop.
//!
//! ## Supported Providers
//!
//! - OpenAI and OpenAI-compatible chat completion APIs
//! - Ollama (native `/api/chat`)
//!
//! [`ModelClient`] sits on top of any [`LlmProvider`] and implements the
//! `VisionModel` and `ReasoningModel` contracts of `agentic-core`, plus the
//! completion and action-outcome validators.

pub mod client;
pub mod message;
pub mod ollama;
pub mod openai;
pub mod prompts;
pub mod traits;

pub use client::{ActionValidation, CompletionCheck, ModelClient};
pub use message::{Message, MessageRole};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use traits::{GenerateOptions, LlmProvider, Response, Usage};

use agentic_core::config::{ModelConfig, ModelProvider};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<u64> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

impl From<ProviderError> for agentic_core::ModelError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidResponse(msg) => Self::InvalidResponse(msg),
            ProviderError::SerdeError(e) => Self::InvalidResponse(e.to_string()),
            ProviderError::ConfigError(msg) | ProviderError::AuthError(msg) => Self::Unavailable(msg),
            other => Self::Request(other.to_string()),
        }
    }
}

/// Build the provider selected in `config`
pub fn provider_from_config(config: &ModelConfig) -> Result<Arc<dyn LlmProvider>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.provider {
        ModelProvider::OpenAi => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                ProviderError::AuthError(
                    "no API key configured (set OPENAI_API_KEY or models.api_key)".to_string(),
                )
            })?;
            let mut provider = OpenAiProvider::new(api_key)
                .with_default_model(&config.reasoning_model)
                .with_timeout(timeout)?;
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Ok(Arc::new(provider))
        }
        ModelProvider::Ollama => {
            let mut provider = OllamaProvider::new()
                .with_default_model(&config.reasoning_model)
                .with_timeout(timeout)?;
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_key() {
        let config = ModelConfig::default();
        assert!(matches!(
            provider_from_config(&config),
            Err(ProviderError::AuthError(_))
        ));
    }

    #[test]
    fn test_provider_selection() {
        let mut config = ModelConfig::default();
        config.api_key = Some("sk-test".into());
        assert_eq!(provider_from_config(&config).unwrap().name(), "openai");

        config.provider = ModelProvider::Ollama;
        config.api_key = None;
        assert_eq!(provider_from_config(&config).unwrap().name(), "ollama");
    }

    #[test]
    fn test_error_conversion() {
        let err: agentic_core::ModelError = ProviderError::InvalidResponse("empty".into()).into();
        assert_eq!(err, agentic_core::ModelError::InvalidResponse("empty".into()));

        let err: agentic_core::ModelError = ProviderError::ApiError {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(matches!(err, agentic_core::ModelError::Request(_)));
    }
}
