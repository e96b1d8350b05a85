//! # Agentic CLI
//!
//! Entry point: run a task locally, serve the agent over HTTP, or drive a
//! remote server.

mod agent;
mod api;
mod cli;
mod commands;
mod server;
mod service;

use agentic_core::AgentConfig;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{Cli, Commands};
use commands::run::RunOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Enable ANSI colors on Windows
    #[cfg(windows)]
    let _ = colored::control::set_virtual_terminal(true);

    let cli = Cli::parse();

    // Default to warn to keep output clean; RUST_LOG wins when set
    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config = match &cli.config {
        Some(path) => AgentConfig::load_with(path)?,
        None => AgentConfig::load()?,
    };

    match cli.command {
        Commands::Run {
            goal,
            task,
            backend,
            max_cycles,
            session_id,
            headless,
        } => {
            let options = RunOptions {
                goal,
                task,
                backend,
                max_cycles,
                session_id,
                headless,
            };
            commands::run::run(config, options).await?;
        }
        Commands::Serve { addr } => {
            commands::serve::run(config, addr).await?;
        }
        Commands::Client {
            url,
            goal,
            task,
            delay_secs,
        } => {
            commands::client::run(url, goal, task, delay_secs).await?;
        }
        Commands::Config { init, global } => {
            commands::config::run(config, init, global).await?;
        }
    }

    Ok(())
}
