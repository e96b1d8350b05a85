//! # Run Command
//!
//! Runs a task in-process until it finishes, the cycle budget runs out or
//! the user presses Ctrl-C.

use crate::agent;
use agentic_core::{AgentConfig, BackendKind, SessionState, StopSignal};
use colored::Colorize;
use std::future::Future;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default)]
pub struct RunOptions {
    pub goal: Option<String>,
    pub task: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub max_cycles: Option<u32>,
    pub session_id: Option<String>,
    pub headless: bool,
}

fn apply_overrides(config: &mut AgentConfig, options: &RunOptions) {
    if let Some(backend) = options.backend {
        config.automation.backend = backend;
    }
    if let Some(max) = options.max_cycles {
        config.cycle.max_cycles = Some(max);
    }
    if options.headless {
        config.automation.headless = true;
    }
}

/// Run the run command
pub async fn run(mut config: AgentConfig, options: RunOptions) -> anyhow::Result<()> {
    let goal = super::resolve_goal(options.goal.clone(), options.task.as_deref())?;
    apply_overrides(&mut config, &options);
    config.validate()?;

    let client = agent::build_model_client(&config)?;
    let controller = agent::build_controller(&config, client)?;

    let session_id = options
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut state = controller.start_session(&session_id, &goal).await;

    println!("{} {}", "Goal:".bright_cyan().bold(), goal);
    println!(
        "{} {} ({} backend)",
        "Session:".bright_cyan().bold(),
        session_id.dimmed(),
        config.automation.backend
    );
    println!();

    let stop = StopSignal::new();
    let ctrl_c = stop.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, &ctrl_c).await {
            eprintln!("{}", "Forced exit".red());
            std::process::exit(130);
        }
    });

    match controller
        .run_observed(&mut state, config.budget(), &stop, print_cycle)
        .await
    {
        Ok(result) => {
            println!("{} {}", "✓ Task finished:".green().bold(), result);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), e);
            Err(e.into())
        }
    }
}

/// First press requests a graceful stop; returns true on a second press,
/// which the caller treats as a forced exit.
async fn watch_interrupts<F, Fut>(mut next_press: F, stop: &StopSignal) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_press().await.is_err() {
        return false;
    }
    info!("Ctrl-C received, stopping after the current phase");
    eprintln!(
        "{}",
        "Stopping after the current phase (Ctrl-C again to force quit)".yellow()
    );
    stop.stop();

    next_press().await.is_ok()
}

fn print_cycle(state: &SessionState) {
    println!("{}", format!("── Cycle {} ──", state.cycles).bright_blue().bold());

    if let Some(plan) = &state.current_plan {
        if let Some(thought) = &plan.thought {
            println!("{} {}", "Thought:".yellow(), thought);
        }
        println!("{} {}", "Intermediate goal:".yellow(), plan.intermediate_goal);
        for (i, action) in plan.actions.iter().enumerate() {
            println!(
                "  {}. {} {}",
                i + 1,
                action.tool.bright_green(),
                action.parameters_json().dimmed()
            );
        }
    }

    if let Some(error) = &state.last_error {
        println!("{} {}", "Error:".red(), error);
    }
    println!();
}
