//! Request and response bodies of the HTTP API.

use agentic_core::{Action, SessionState};
use serde::{Deserialize, Serialize};

/// `POST /v1/agent/execute` form body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub session_id: String,
    pub goal: String,
    /// PNG screenshot taken by the caller, used instead of a local capture
    #[serde(default)]
    pub screenshot_base64: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    InProgress,
}

/// What the agent did in the cycle that just ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub thought: Option<String>,
    pub intermediate_goal: Option<String>,
    #[serde(default)]
    pub plan: Vec<Action>,
    pub vision_analysis: Option<String>,
    pub last_error: Option<String>,
}

impl CycleSnapshot {
    pub fn capture(state: &SessionState) -> Self {
        let plan = state.current_plan.as_ref();
        Self {
            thought: plan.and_then(|p| p.thought.clone()),
            intermediate_goal: plan.map(|p| p.intermediate_goal.clone()),
            plan: plan.map(|p| p.actions.clone()).unwrap_or_default(),
            vision_analysis: state.last_vision_analysis.clone(),
            last_error: state.last_error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CycleSnapshot>,
}

impl TaskResponse {
    pub fn completed(output: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Completed,
            output: Some(output.into()),
            data: None,
        }
    }

    pub fn in_progress(snapshot: CycleSnapshot) -> Self {
        Self {
            status: TaskStatus::InProgress,
            output: None,
            data: Some(snapshot),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateActionRequest {
    pub screenshot_base64: String,
    pub desired_outcome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateCompletionRequest {
    pub goal: String,
    pub screen_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
