//! # CLI Arguments
//!
//! Command-line argument definitions using clap.

use agentic_core::BackendKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agentic - a vision-driven agent for browsers and desktops
#[derive(Parser, Debug)]
#[command(name = "agentic")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (overrides the project and global files)
    #[arg(short, long, global = true, env = "AGENTIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a task locally until it finishes
    Run {
        /// Goal in natural language
        #[arg(short, long, conflicts_with = "task")]
        goal: Option<String>,

        /// JSON task file: {"goal": "..."}
        #[arg(short, long)]
        task: Option<PathBuf>,

        /// Automation backend (overrides config)
        #[arg(short, long)]
        backend: Option<BackendKind>,

        /// Maximum number of cycles (overrides config)
        #[arg(long)]
        max_cycles: Option<u32>,

        /// Session id used for memory (generated when omitted)
        #[arg(long)]
        session_id: Option<String>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,
    },

    /// Serve the agent over HTTP
    Serve {
        /// Listen address (overrides config)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Drive a task on a running server
    Client {
        /// Server base URL
        #[arg(short, long, default_value = "http://127.0.0.1:8000")]
        url: String,

        /// Goal in natural language
        #[arg(short, long, conflicts_with = "task")]
        goal: Option<String>,

        /// JSON task file: {"goal": "..."}
        #[arg(short, long)]
        task: Option<PathBuf>,

        /// Seconds to wait between cycles
        #[arg(long, default_value_t = 2)]
        delay_secs: u64,
    },

    /// Show or initialize configuration
    Config {
        /// Write the default configuration to the project file
        #[arg(long)]
        init: bool,

        /// With --init, write the global file instead
        #[arg(long, requires = "init")]
        global: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let cli = Cli::parse_from([
            "agentic", "-v", "run", "--goal", "find the weather", "--backend", "hybrid",
            "--max-cycles", "3",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                goal,
                backend,
                max_cycles,
                ..
            } => {
                assert_eq!(goal.as_deref(), Some("find the weather"));
                assert_eq!(backend, Some(BackendKind::Hybrid));
                assert_eq!(max_cycles, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_goal_and_task_conflict() {
        assert!(Cli::try_parse_from(["agentic", "run", "-g", "x", "-t", "task.json"]).is_err());
    }

    #[test]
    fn test_client_defaults() {
        let cli = Cli::parse_from(["agentic", "client", "--goal", "x"]);
        match cli.command {
            Commands::Client { url, delay_secs, .. } => {
                assert_eq!(url, "http://127.0.0.1:8000");
                assert_eq!(delay_secs, 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
