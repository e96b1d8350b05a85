//! # Action Model
//!
//! Typed representation of the steps produced by the reasoning model.
//!
//! An [`Action`] is a tool name plus a parameter map. The tool catalogue is
//! open: nothing here checks whether a tool exists, that happens when the
//! dispatcher looks the name up in its [`ToolRegistry`](crate::tools::ToolRegistry).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters of a single tool invocation
pub type Parameters = Map<String, Value>;

/// Intermediate goal used when the model omits one
pub const DEFAULT_INTERMEDIATE_GOAL: &str = "N/A";

/// One executable step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Tool name, never empty
    pub tool: String,
    /// Tool parameters
    #[serde(default)]
    pub parameters: Parameters,
}

impl Action {
    /// Create an action. Returns `None` when `tool` is empty.
    pub fn new(tool: impl Into<String>, parameters: Parameters) -> Option<Self> {
        let tool = tool.into();
        if tool.trim().is_empty() {
            return None;
        }
        Some(Self { tool, parameters })
    }

    /// Build an action from a decoded JSON object.
    ///
    /// Requires a non-empty string `tool`; `parameters` defaults to an empty
    /// map when absent. A `parameters` value that is not an object is rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let tool = object.get("tool")?.as_str()?;
        let parameters = match object.get("parameters") {
            None | Some(Value::Null) => Parameters::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return None,
        };
        Self::new(tool, parameters)
    }

    /// String parameter lookup
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    /// Parameters rendered as compact JSON, for history entries
    pub fn parameters_json(&self) -> String {
        Value::Object(self.parameters.clone()).to_string()
    }
}

/// A parsed plan: one intermediate goal and the actions that reach it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Sub-goal the actions work towards
    pub intermediate_goal: String,
    /// Ordered actions
    #[serde(rename = "plan")]
    pub actions: Vec<Action>,
    /// Model reasoning behind the plan, when provided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

impl Plan {
    /// Create a plan
    pub fn new(intermediate_goal: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            intermediate_goal: intermediate_goal.into(),
            actions,
            thought: None,
        }
    }

    /// The plan used when nothing executable came out of a reasoning call
    pub fn empty() -> Self {
        Self::new(DEFAULT_INTERMEDIATE_GOAL, Vec::new())
    }

    /// Attach the model's reasoning
    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::empty()
    }
}
