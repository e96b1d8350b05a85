//! # Config Command
//!
//! Show the effective configuration or write a default file.

use agentic_core::AgentConfig;
use anyhow::Context;
use colored::Colorize;

/// Run the config command
pub async fn run(config: AgentConfig, init: bool, global: bool) -> anyhow::Result<()> {
    if init {
        let path = if global {
            AgentConfig::global_config_path()
        } else {
            AgentConfig::project_config_path()
        }
        .context("could not determine the configuration directory")?;

        if path.exists() {
            println!(
                "{} {} already exists",
                "Warning:".yellow(),
                path.display().to_string().bright_yellow()
            );
            return Ok(());
        }

        AgentConfig::default().save_to_file(&path)?;
        println!("{} Wrote {}", "✓".green(), path.display());
        return Ok(());
    }

    println!("{}", "Current Configuration".bright_cyan().bold());
    match &config.loaded_from {
        Some(path) => println!("{} {}", "Loaded from:".dimmed(), path.display()),
        None => println!("{}", "Using defaults (no configuration file found)".dimmed()),
    }
    println!();

    let mut shown = config.clone();
    if shown.models.api_key.is_some() {
        shown.models.api_key = Some("********".to_string());
    }
    println!("{}", shown.to_toml()?);
    Ok(())
}
