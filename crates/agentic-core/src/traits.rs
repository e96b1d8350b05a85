//! # Collaborator Traits
//!
//! Narrow contracts for the services the loop depends on: the vision model,
//! the reasoning model and the long-term memory store.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from model backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

/// Errors from memory stores
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Memory store unavailable: {0}")]
    Unavailable(String),

    #[error("Memory store operation failed: {0}")]
    OperationFailed(String),
}

/// Input to a reasoning call
#[derive(Debug, Clone, Copy)]
pub struct PlanningRequest<'a> {
    pub goal: &'a str,
    pub screen_description: &'a str,
    pub history: &'a [String],
    pub previous_error: Option<&'a str>,
}

/// Describes a screenshot in terms of the goal
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Analyze a PNG screenshot
    async fn analyze(&self, image: &[u8], goal: &str) -> Result<String, ModelError>;
}

/// Produces the next plan as raw text
#[async_trait]
pub trait ReasoningModel: Send + Sync {
    /// Expected to contain a JSON object with `thought`, `intermediate_goal` and `plan`
    async fn plan(&self, request: PlanningRequest<'_>) -> Result<String, ModelError>;
}

/// Long-term recall, keyed by session
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Store a text record
    async fn add(&self, session_id: &str, text: &str) -> Result<(), StoreError>;

    /// Prior records relevant to `query`, most relevant first
    async fn search(&self, session_id: &str, query: &str) -> Result<Vec<String>, StoreError>;
}
