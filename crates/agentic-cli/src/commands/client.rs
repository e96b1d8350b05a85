//! # Client Command
//!
//! Drives a task on a running `agentic serve`: triggers one cycle per
//! request until the server reports the task completed.

use crate::api::{CycleSnapshot, TaskResponse, TaskStatus};
use anyhow::{bail, Context};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Run the client command
pub async fn run(
    url: String,
    goal: Option<String>,
    task: Option<PathBuf>,
    delay_secs: u64,
) -> anyhow::Result<()> {
    let goal = super::resolve_goal(goal, task.as_deref())?;
    let session_id = uuid::Uuid::new_v4().to_string();

    println!("{} {}", "Goal:".bright_cyan().bold(), goal);
    println!("{} {}", "Session:".bright_cyan().bold(), session_id.dimmed());
    println!();

    let output = drive(&url, &session_id, &goal, Duration::from_secs(delay_secs)).await?;
    println!("{} {}", "✓ Task finished:".green().bold(), output);
    Ok(())
}

/// Trigger cycles until the task completes; returns the final output
pub async fn drive(
    base_url: &str,
    session_id: &str,
    goal: &str,
    delay: Duration,
) -> anyhow::Result<String> {
    let http = reqwest::Client::new();
    let endpoint = format!("{}/v1/agent/execute", base_url.trim_end_matches('/'));
    let mut cycle = 0u32;

    loop {
        cycle += 1;
        debug!("Triggering cycle {} of session {}", cycle, session_id);

        let response = http
            .post(&endpoint)
            .form(&[("session_id", session_id), ("goal", goal)])
            .send()
            .await
            .with_context(|| format!("could not reach {}", endpoint))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("server returned {}: {}", status, body);
        }

        let reply: TaskResponse = serde_json::from_str(&body)
            .with_context(|| format!("unexpected response from server: {}", body))?;

        match reply.status {
            TaskStatus::Completed => return Ok(reply.output.unwrap_or_default()),
            TaskStatus::InProgress => {
                print_progress(cycle, reply.data.as_ref());
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn print_progress(cycle: u32, data: Option<&CycleSnapshot>) {
    println!("{}", format!("── Cycle {} ──", cycle).bright_blue().bold());
    let Some(data) = data else {
        println!();
        return;
    };

    if let Some(thought) = &data.thought {
        println!("{} {}", "Thought:".yellow(), thought);
    }
    if let Some(goal) = &data.intermediate_goal {
        println!("{} {}", "Intermediate goal:".yellow(), goal);
    }
    for (i, action) in data.plan.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            action.tool.bright_green(),
            action.parameters_json().dimmed()
        );
    }
    if let Some(error) = &data.last_error {
        println!("{} {}", "Error:".red(), error);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_drive_returns_output_when_completed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/agent/execute")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("session_id".into(), "s1".into()),
                Matcher::UrlEncoded("goal".into(), "weather in Paris".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status": "completed", "output": "18C and sunny"}"#)
            .create_async()
            .await;

        let output = drive(&server.url(), "s1", "weather in Paris", Duration::ZERO)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(output, "18C and sunny");
    }

    #[tokio::test]
    async fn test_drive_stops_on_unexpected_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/agent/execute")
            .with_status(200)
            .with_body(r#"{"status": "failed"}"#)
            .create_async()
            .await;

        let err = drive(&server.url(), "s1", "g", Duration::ZERO).await.unwrap_err();
        assert!(err.to_string().contains("unexpected response"));
    }

    #[tokio::test]
    async fn test_drive_stops_on_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/agent/execute")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = drive(&server.url(), "s1", "g", Duration::ZERO).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
