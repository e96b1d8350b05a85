//! # Tool Catalogue
//!
//! The dispatch table that maps tool names from model output onto typed
//! [`ToolCommand`]s. The table is open: callers can [`register`](ToolRegistry::register)
//! further tools, and names that are not in the table fail at dispatch time.
//!
//! Built-in tools:
//!
//! | Tool | Parameters |
//! |------|------------|
//! | `navigate` | `url` |
//! | `click` | `selector`, or `coordinates` as `[x, y]` / `{"x", "y"}`, or `x` + `y` |
//! | `type_text` | `text`, optional `selector` (focused element otherwise) |
//! | `scroll` | `direction`: `up` or `down` (default `down`) |
//! | `finish_task` | optional `result` |

use crate::action::Parameters;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Name of the terminal tool
pub const FINISH_TASK: &str = "finish_task";

/// Result reported when `finish_task` carries none
pub const DEFAULT_FINISH_RESULT: &str = "Task completed successfully.";

/// Tool parameter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Where a click lands
#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
    /// CSS selector in the browser
    Selector(String),
    /// Absolute screen coordinates
    Point { x: i32, y: i32 },
}

/// Scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// A validated backend action
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCommand {
    Navigate { url: String },
    Click { target: ClickTarget },
    TypeText { selector: Option<String>, text: String },
    Scroll { direction: ScrollDirection },
    /// A registered tool with no built-in meaning, passed through to the backend
    Extension { tool: String, parameters: Parameters },
}

impl ToolCommand {
    /// Tool name this command was built from
    pub fn tool_name(&self) -> &str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::Click { .. } => "click",
            Self::TypeText { .. } => "type_text",
            Self::Scroll { .. } => "scroll",
            Self::Extension { tool, .. } => tool,
        }
    }

    /// Whether the command addresses page elements by selector
    pub fn uses_selector(&self) -> bool {
        matches!(
            self,
            Self::Click {
                target: ClickTarget::Selector(_)
            } | Self::TypeText {
                selector: Some(_),
                ..
            }
        )
    }
}

/// Parameter validator for a backend tool
pub type CommandBuilder = fn(&str, &Parameters) -> Result<ToolCommand, ToolError>;

/// How the dispatcher treats a tool
#[derive(Clone, Copy)]
pub enum ToolKind {
    /// Needs a running automation session
    Backend(CommandBuilder),
    /// Ends the task
    Terminal,
}

impl fmt::Debug for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(_) => write!(f, "Backend"),
            Self::Terminal => write!(f, "Terminal"),
        }
    }
}

/// Dispatch table from tool names to their handling
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolKind>,
}

impl ToolRegistry {
    /// A registry with no tools
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register or replace a tool
    pub fn register(&mut self, name: impl Into<String>, kind: ToolKind) -> &mut Self {
        self.tools.insert(name.into(), kind);
        self
    }

    /// Register a tool that is forwarded to the backend untouched
    pub fn register_extension(&mut self, name: impl Into<String>) -> &mut Self {
        self.register(name, ToolKind::Backend(build_extension))
    }

    pub fn lookup(&self, name: &str) -> Option<ToolKind> {
        self.tools.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("navigate", ToolKind::Backend(build_navigate))
            .register("click", ToolKind::Backend(build_click))
            .register("type_text", ToolKind::Backend(build_type_text))
            .register("scroll", ToolKind::Backend(build_scroll))
            .register(FINISH_TASK, ToolKind::Terminal);
        registry
    }
}

/// Result text carried by a `finish_task` action
pub fn finish_result(parameters: &Parameters) -> String {
    match parameters.get("result") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Null) | None => DEFAULT_FINISH_RESULT.to_string(),
        Some(Value::String(_)) => DEFAULT_FINISH_RESULT.to_string(),
        Some(other) => other.to_string(),
    }
}

fn required_str(parameters: &Parameters, name: &'static str) -> Result<String, ToolError> {
    match parameters.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(ToolError::MissingParameter(name)),
        Some(other) => Err(ToolError::InvalidParameter {
            name,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

fn optional_str(parameters: &Parameters, name: &'static str) -> Option<String> {
    parameters
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn coordinate(value: &Value, name: &'static str) -> Result<i32, ToolError> {
    value
        .as_f64()
        .map(|v| v.round() as i32)
        .ok_or_else(|| ToolError::InvalidParameter {
            name,
            reason: format!("expected a number, got {}", value),
        })
}

fn build_navigate(_tool: &str, parameters: &Parameters) -> Result<ToolCommand, ToolError> {
    Ok(ToolCommand::Navigate {
        url: required_str(parameters, "url")?,
    })
}

fn build_click(_tool: &str, parameters: &Parameters) -> Result<ToolCommand, ToolError> {
    if let Some(selector) = optional_str(parameters, "selector") {
        return Ok(ToolCommand::Click {
            target: ClickTarget::Selector(selector),
        });
    }

    let point = match parameters.get("coordinates") {
        Some(Value::Array(items)) if items.len() == 2 => {
            Some((coordinate(&items[0], "coordinates")?, coordinate(&items[1], "coordinates")?))
        }
        Some(Value::Object(map)) => match (map.get("x"), map.get("y")) {
            (Some(x), Some(y)) => Some((coordinate(x, "coordinates")?, coordinate(y, "coordinates")?)),
            _ => None,
        },
        Some(other) if !other.is_null() => {
            return Err(ToolError::InvalidParameter {
                name: "coordinates",
                reason: format!("expected [x, y] or {{\"x\", \"y\"}}, got {}", other),
            })
        }
        _ => match (parameters.get("x"), parameters.get("y")) {
            (Some(x), Some(y)) => Some((coordinate(x, "x")?, coordinate(y, "y")?)),
            _ => None,
        },
    };

    match point {
        Some((x, y)) => Ok(ToolCommand::Click {
            target: ClickTarget::Point { x, y },
        }),
        None => Err(ToolError::MissingParameter("selector")),
    }
}

fn build_type_text(_tool: &str, parameters: &Parameters) -> Result<ToolCommand, ToolError> {
    let text = match parameters.get("text") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => return Err(ToolError::MissingParameter("text")),
        Some(other) => other.to_string(),
    };
    Ok(ToolCommand::TypeText {
        selector: optional_str(parameters, "selector"),
        text,
    })
}

fn build_scroll(_tool: &str, parameters: &Parameters) -> Result<ToolCommand, ToolError> {
    let direction = match optional_str(parameters, "direction") {
        None => ScrollDirection::Down,
        Some(d) => match d.to_lowercase().as_str() {
            "up" => ScrollDirection::Up,
            "down" => ScrollDirection::Down,
            other => {
                return Err(ToolError::InvalidParameter {
                    name: "direction",
                    reason: format!("expected 'up' or 'down', got '{}'", other),
                })
            }
        },
    };
    Ok(ToolCommand::Scroll { direction })
}

fn build_extension(tool: &str, parameters: &Parameters) -> Result<ToolCommand, ToolError> {
    Ok(ToolCommand::Extension {
        tool: tool.to_string(),
        parameters: parameters.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap()
    }

    fn build(registry: &ToolRegistry, tool: &str, value: Value) -> Result<ToolCommand, ToolError> {
        match registry.lookup(tool) {
            Some(ToolKind::Backend(builder)) => builder(tool, &params(value)),
            other => panic!("{} is not a backend tool: {:?}", tool, other),
        }
    }

    #[test]
    fn test_default_catalogue() {
        let registry = ToolRegistry::default();
        assert_eq!(
            registry.names(),
            vec!["click", "finish_task", "navigate", "scroll", "type_text"]
        );
        assert!(matches!(registry.lookup(FINISH_TASK), Some(ToolKind::Terminal)));
        assert!(registry.lookup("drag").is_none());
    }

    #[test]
    fn test_click_targets() {
        let registry = ToolRegistry::default();
        assert_eq!(
            build(&registry, "click", json!({"selector": "#go"})).unwrap(),
            ToolCommand::Click { target: ClickTarget::Selector("#go".into()) }
        );
        assert_eq!(
            build(&registry, "click", json!({"coordinates": [10, 20.6]})).unwrap(),
            ToolCommand::Click { target: ClickTarget::Point { x: 10, y: 21 } }
        );
        assert_eq!(
            build(&registry, "click", json!({"coordinates": {"x": 5, "y": 6}})).unwrap(),
            ToolCommand::Click { target: ClickTarget::Point { x: 5, y: 6 } }
        );
        assert_eq!(
            build(&registry, "click", json!({"x": 1, "y": 2})).unwrap(),
            ToolCommand::Click { target: ClickTarget::Point { x: 1, y: 2 } }
        );
        assert!(build(&registry, "click", json!({})).is_err());
        assert!(build(&registry, "click", json!({"coordinates": "middle"})).is_err());
    }

    #[test]
    fn test_navigate_requires_url() {
        let registry = ToolRegistry::default();
        assert_eq!(
            build(&registry, "navigate", json!({})),
            Err(ToolError::MissingParameter("url"))
        );
    }

    #[test]
    fn test_type_text_selector_is_optional() {
        let registry = ToolRegistry::default();
        let command = build(&registry, "type_text", json!({"text": "hello"})).unwrap();
        assert_eq!(command, ToolCommand::TypeText { selector: None, text: "hello".into() });
        assert!(!command.uses_selector());
        assert!(build(&registry, "type_text", json!({"selector": "#q"})).is_err());
    }

    #[test]
    fn test_scroll_direction() {
        let registry = ToolRegistry::default();
        assert_eq!(
            build(&registry, "scroll", json!({"direction": "UP"})).unwrap(),
            ToolCommand::Scroll { direction: ScrollDirection::Up }
        );
        assert_eq!(
            build(&registry, "scroll", json!({})).unwrap(),
            ToolCommand::Scroll { direction: ScrollDirection::Down }
        );
        assert!(build(&registry, "scroll", json!({"direction": "left"})).is_err());
    }

    #[test]
    fn test_registered_extension_passes_through() {
        let mut registry = ToolRegistry::default();
        registry.register_extension("hover");
        let command = build(&registry, "hover", json!({"selector": "nav"})).unwrap();
        assert_eq!(command.tool_name(), "hover");
    }

    #[test]
    fn test_finish_result_default() {
        assert_eq!(finish_result(&params(json!({}))), DEFAULT_FINISH_RESULT);
        assert_eq!(finish_result(&params(json!({"result": "done"}))), "done");
    }
}
