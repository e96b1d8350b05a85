//! # Model Client
//!
//! Binds an [`LlmProvider`] to the vision and reasoning contracts of the
//! agent loop, and adds the two validators.

use crate::prompts;
use crate::{GenerateOptions, LlmProvider, Message, ProviderError, Result};
use agentic_core::parser::strip_code_fence;
use agentic_core::{ModelError, PlanningRequest, ReasoningModel, ToolRegistry, VisionModel};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Verdict of the completion validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionCheck {
    pub is_complete: bool,
    #[serde(default)]
    pub reasoning: String,
}

/// Verdict of the action-outcome validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionValidation {
    pub validated: bool,
    #[serde(default)]
    pub reasoning: String,
}

/// Vision and reasoning calls on top of one provider
pub struct ModelClient {
    provider: Arc<dyn LlmProvider>,
    vision_model: String,
    reasoning_model: String,
    temperature: f32,
    registry: ToolRegistry,
}

impl ModelClient {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        vision_model: impl Into<String>,
        reasoning_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            vision_model: vision_model.into(),
            reasoning_model: reasoning_model.into(),
            temperature: 0.2,
            registry: ToolRegistry::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Tool catalogue advertised in the planning prompt
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn vision_options(&self) -> GenerateOptions {
        GenerateOptions::default()
            .with_model(&self.vision_model)
            .with_temperature(self.temperature)
    }

    fn reasoning_options(&self) -> GenerateOptions {
        GenerateOptions::default()
            .with_model(&self.reasoning_model)
            .with_temperature(self.temperature)
            .json()
    }

    /// Describe a PNG screenshot in terms of `goal`
    pub async fn describe_screen(&self, image: &[u8], goal: &str) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let messages = [Message::user(prompts::vision_prompt(goal)).with_image(encoded)];
        let response = self.provider.chat(&messages, &self.vision_options()).await?;
        let text = response.content.trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "vision model returned no text".to_string(),
            ));
        }
        Ok(text)
    }

    /// Ask for the next plan; returns the raw model text
    pub async fn next_plan(&self, request: PlanningRequest<'_>) -> Result<String> {
        let messages = [
            Message::system(prompts::planning_system_prompt()),
            Message::user(prompts::planning_user_prompt(&request, &self.registry)),
        ];
        let response = self
            .provider
            .chat(&messages, &self.reasoning_options())
            .await?;
        Ok(response.content.trim().to_string())
    }

    /// Judge whether `goal` is achieved given the final screen description
    pub async fn validate_completion(
        &self,
        goal: &str,
        screen_description: &str,
    ) -> Result<CompletionCheck> {
        let messages = [
            Message::system(prompts::completion_system_prompt()),
            Message::user(prompts::completion_user_prompt(goal, screen_description)),
        ];
        let options = GenerateOptions::default()
            .with_model(&self.reasoning_model)
            .with_temperature(0.0)
            .json();
        let response = self.provider.chat(&messages, &options).await?;
        decode_verdict(&response.content)
    }

    /// Judge whether a screenshot shows `desired_outcome`
    pub async fn validate_action_outcome(
        &self,
        screenshot_base64: &str,
        desired_outcome: &str,
    ) -> Result<ActionValidation> {
        let messages = [Message::user(prompts::action_validation_prompt(desired_outcome))
            .with_image(screenshot_base64)];
        let options = GenerateOptions::default()
            .with_model(&self.vision_model)
            .with_temperature(0.0)
            .json();
        let response = self.provider.chat(&messages, &options).await?;
        decode_verdict(&response.content)
    }
}

fn decode_verdict<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    if let Ok(verdict) = serde_json::from_str(raw.trim()) {
        return Ok(verdict);
    }
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
        debug!("Undecodable verdict: {}", raw);
        ProviderError::InvalidResponse(format!("expected a verdict object: {}", e))
    })
}

#[async_trait]
impl VisionModel for ModelClient {
    async fn analyze(&self, image: &[u8], goal: &str) -> std::result::Result<String, ModelError> {
        self.describe_screen(image, goal).await.map_err(|e| {
            warn!("{} vision call failed: {}", self.provider.name(), e);
            e.into()
        })
    }
}

#[async_trait]
impl ReasoningModel for ModelClient {
    async fn plan(&self, request: PlanningRequest<'_>) -> std::result::Result<String, ModelError> {
        self.next_plan(request).await.map_err(|e| {
            warn!("{} reasoning call failed: {}", self.provider.name(), e);
            e.into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Response, Usage};
    use std::sync::Mutex;

    /// Provider that replays one answer and records what it was sent
    struct CannedProvider {
        answer: std::result::Result<String, u16>,
        seen: Mutex<Vec<(Vec<Message>, GenerateOptions)>>,
    }

    impl CannedProvider {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(status),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn default_model(&self) -> &str {
            "canned-model"
        }

        async fn chat(&self, messages: &[Message], options: &GenerateOptions) -> Result<Response> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.clone()));
            match &self.answer {
                Ok(content) => Ok(Response {
                    content: content.clone(),
                    model: options.model.clone().unwrap_or_default(),
                    finish_reason: None,
                    usage: Some(Usage::default()),
                }),
                Err(status) => Err(ProviderError::ApiError {
                    status: *status,
                    message: "down".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_analyze_sends_base64_image_to_vision_model() {
        let provider = CannedProvider::new("Element: Search box, Coords: [1, 2, 3, 4]");
        let client = ModelClient::new(provider.clone(), "llava", "llama3");

        let text = client.analyze(b"png", "search").await.unwrap();
        assert!(text.starts_with("Element: Search box"));

        let seen = provider.seen.lock().unwrap();
        let (messages, options) = &seen[0];
        assert_eq!(options.model.as_deref(), Some("llava"));
        assert_eq!(messages[0].images, vec!["cG5n"]);
    }

    #[tokio::test]
    async fn test_plan_uses_reasoning_model_in_json_mode() {
        let provider = CannedProvider::new("  {\"plan\": []}  ");
        let client = ModelClient::new(provider.clone(), "llava", "llama3");
        let request = PlanningRequest {
            goal: "g",
            screen_description: "s",
            history: &[],
            previous_error: Some("boom"),
        };

        assert_eq!(client.plan(request).await.unwrap(), "{\"plan\": []}");

        let seen = provider.seen.lock().unwrap();
        let (messages, options) = &seen[0];
        assert_eq!(options.model.as_deref(), Some("llama3"));
        assert!(options.json_mode);
        assert!(messages[1].content.contains("boom"));
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_model_error() {
        let client = ModelClient::new(CannedProvider::failing(503), "v", "r");
        let err = client.analyze(b"png", "g").await.unwrap_err();
        assert!(matches!(err, ModelError::Request(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_empty_vision_answer_is_an_error() {
        let client = ModelClient::new(CannedProvider::new("   "), "v", "r");
        assert!(matches!(
            client.analyze(b"png", "g").await,
            Err(ModelError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_validate_completion() {
        let provider = CannedProvider::new(
            "```json\n{\"is_complete\": false, \"reasoning\": \"results not opened yet\"}\n```",
        );
        let client = ModelClient::new(provider, "v", "r");
        let check = client.validate_completion("weather", "search results").await.unwrap();
        assert!(!check.is_complete);
        assert_eq!(check.reasoning, "results not opened yet");
    }

    #[tokio::test]
    async fn test_validate_action_outcome() {
        let provider = CannedProvider::new("{\"validated\": true}");
        let client = ModelClient::new(provider.clone(), "v", "r");
        let verdict = client.validate_action_outcome("AAAA", "logged in").await.unwrap();
        assert!(verdict.validated);
        assert!(verdict.reasoning.is_empty());
        assert_eq!(provider.seen.lock().unwrap()[0].0[0].images, vec!["AAAA"]);
    }

    #[tokio::test]
    async fn test_verdict_reasoning_with_backticks() {
        let provider = CannedProvider::new(
            "{\"is_complete\": true, \"reasoning\": \"the ```README``` is open\"}",
        );
        let client = ModelClient::new(provider, "v", "r");
        let check = client.validate_completion("open readme", "editor").await.unwrap();
        assert!(check.is_complete);
        assert_eq!(check.reasoning, "the ```README``` is open");
    }

    #[tokio::test]
    async fn test_garbage_verdict_is_invalid_response() {
        let client = ModelClient::new(CannedProvider::new("yes"), "v", "r");
        assert!(matches!(
            client.validate_action_outcome("AAAA", "x").await,
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
