// SPDX-FileCopyrightText: 2026 Reverie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reverie - a personal conversational journaling assistant.
//!
//! This is the binary entry point.

mod chat;
mod config_cmd;
mod serve;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reverie_config::ReverieConfig;

/// Reverie - a personal conversational journaling assistant.
#[derive(Parser, Debug)]
#[command(name = "reverie", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Journal interactively in the terminal.
    Chat {
        /// Continue this conversation instead of the most recent one.
        #[arg(long, conflicts_with = "journey")]
        conversation: Option<String>,
        /// Start a new conversation from this journey.
        #[arg(long)]
        journey: Option<String>,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum ConfigAction {
    /// Validate configuration and report every problem.
    Check,
    /// Print the resolved configuration with credentials redacted.
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(config) = load_config(cli.config.as_deref()) else {
        return ExitCode::FAILURE;
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            init_tracing(&config.agent.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Chat {
            conversation,
            journey,
        }) => {
            // Keep the REPL readable: only warnings unless RUST_LOG says otherwise.
            init_tracing("warn");
            chat::run_chat(config, conversation, journey).await
        }
        Some(Commands::Config { action }) => config_cmd::run_config(&config, action),
        None => {
            println!("reverie: use --help for available commands");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Loads and validates configuration, rendering diagnostics on failure.
fn load_config(path: Option<&Path>) -> Option<ReverieConfig> {
    let loaded = match path {
        Some(path) => reverie_config::load_and_validate_path(path),
        None => reverie_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            reverie_config::render_errors(&errors);
            None
        }
    }
}

/// Initializes the global subscriber. `RUST_LOG` wins over `log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("reverie={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
