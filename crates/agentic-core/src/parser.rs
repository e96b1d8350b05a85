//! # Plan Parser
//!
//! Turns raw reasoning-model text into a [`Plan`].
//!
//! The model is asked for a JSON object, but what comes back is often wrapped
//! in a fenced code block or surrounded by prose. Parsing is relaxed:
//!
//! - text that already decodes as JSON is taken whole
//! - otherwise the first fenced code block wins, closed by a fence at the start of a line
//! - a payload that still does not decode is retried on its outermost `{...}` span
//! - `intermediate_goal` defaults to `"N/A"`, `plan` defaults to `[]`
//! - plan elements without `tool` or `parameters` are dropped, not fatal

use crate::action::{Action, Plan, DEFAULT_INTERMEDIATE_GOAL};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Plan parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Malformed plan payload: {0}")]
    Malformed(String),

    #[error("Plan payload is not a JSON object")]
    NotAnObject,
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse raw model output into a plan
pub fn parse_plan(raw: &str) -> Result<Plan> {
    let value = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => value,
        Err(_) => decode(strip_code_fence(raw))?,
    };

    let object = value.as_object().ok_or(ParseError::NotAnObject)?;

    let intermediate_goal = object
        .get("intermediate_goal")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_INTERMEDIATE_GOAL)
        .to_string();

    let thought = object
        .get("thought")
        .and_then(Value::as_str)
        .map(str::to_string);

    let elements = match object.get("plan") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(other) => {
            debug!("Ignoring non-list plan field: {}", other);
            &[]
        }
        None => &[],
    };

    let actions: Vec<Action> = elements.iter().filter_map(parse_element).collect();

    if actions.len() < elements.len() {
        debug!(
            "Dropped {} malformed plan element(s)",
            elements.len() - actions.len()
        );
    }

    Ok(Plan {
        intermediate_goal,
        actions,
        thought,
    })
}

/// A plan element must carry both `tool` and `parameters`
fn parse_element(element: &Value) -> Option<Action> {
    let object = element.as_object()?;
    if !object.contains_key("parameters") {
        return None;
    }
    Action::from_value(element)
}

fn decode(payload: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let start = payload.find('{');
            let end = payload.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if end > start => {
                    serde_json::from_str(&payload[start..=end])
                        .map_err(|e| ParseError::Malformed(e.to_string()))
                }
                _ => Err(ParseError::Malformed(first_err.to_string())),
            }
        }
    }
}

/// Return the body of the first fenced code block, or the trimmed text when
/// there is no complete block.
///
/// Fences only count at the start of a line, so backticks quoted inside JSON
/// strings never open or close a block.
pub fn strip_code_fence(raw: &str) -> &str {
    const FENCE: &str = "```";

    let Some(open) = line_start_fence(raw) else {
        return raw.trim();
    };
    let after_open = &raw[open + FENCE.len()..];

    // Skip the info string (`json`, `JSON`, ...) up to the end of the line
    let Some(newline) = after_open.find('\n') else {
        return raw.trim();
    };
    let info = &after_open[..newline];
    if !info.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
        return raw.trim();
    }
    let body = &after_open[newline + 1..];

    match line_start_fence(body) {
        Some(close) => body[..close].trim(),
        None => raw.trim(),
    }
}

/// Byte offset of the first "```" that begins a line, indentation allowed
fn line_start_fence(text: &str) -> Option<usize> {
    let mut pos = 0;
    while let Some(found) = text[pos..].find("```") {
        let at = pos + found;
        let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
        if text[line_start..at].trim().is_empty() {
            return Some(at);
        }
        pos = at + 3;
    }
    None
}
