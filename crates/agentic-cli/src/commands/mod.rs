//! # CLI Commands
//!
//! Subcommand implementations for the agentic CLI.

pub mod client;
pub mod config;
pub mod run;
pub mod serve;

use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::Path;

/// JSON task file
#[derive(Debug, Deserialize)]
struct TaskFile {
    goal: String,
}

/// The goal from `--goal` or from a `--task` file
pub(crate) fn resolve_goal(goal: Option<String>, task: Option<&Path>) -> anyhow::Result<String> {
    let goal = match (goal, task) {
        (Some(goal), _) => goal,
        (None, Some(path)) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read task file {}", path.display()))?;
            let file: TaskFile = serde_json::from_str(&content)
                .with_context(|| format!("task file {} has no \"goal\"", path.display()))?;
            file.goal
        }
        (None, None) => bail!("provide a goal with --goal or a task file with --task"),
    };

    if goal.trim().is_empty() {
        bail!("the goal must not be empty");
    }
    Ok(goal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_goal_from_flag() {
        assert_eq!(resolve_goal(Some("x".into()), None).unwrap(), "x");
    }

    #[test]
    fn test_goal_from_task_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"goal": "What is the weather in Paris?"}}"#).unwrap();
        assert_eq!(
            resolve_goal(None, Some(file.path())).unwrap(),
            "What is the weather in Paris?"
        );
    }

    #[test]
    fn test_missing_goal() {
        assert!(resolve_goal(None, None).is_err());
        assert!(resolve_goal(Some("  ".into()), None).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"task": "x"}}"#).unwrap();
        assert!(resolve_goal(None, Some(file.path())).is_err());
    }
}
