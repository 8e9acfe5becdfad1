//! # Furhi Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! This file serves as the main entry point for Furhi, a hybrid chatbot
//! backend. It handles:
//! - Loading a `.env` file into the process environment (if present)
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Routing execution to the appropriate command handler
//!
//! ## Architecture
//!
//! - `bot`: rule matching, request routing, conversation context, replies
//! - `services`: language model, image generation and history file clients
//! - `commands`: `serve`, `chat` and `imagine`
//! - `core`: configuration and error types
//!
//! All errors are propagated to this level for consistent handling.
//!
//! ## Examples
//!
//! ```bash
//! # Run the HTTP backend with info logging
//! furhi -v serve
//!
//! # Chat in the terminal
//! furhi chat
//!
//! # Generate one image
//! furhi imagine a sunset behind mountains
//! ```
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod bot; // Rules, routing and conversation state
mod commands; // Command handlers (serve, chat, imagine)
mod core; // Core infrastructure (errors, config)
mod services; // Upstream API clients and history storage

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "furhi",
    about = "🤖 Furhi: hybrid rule / LLM / image chatbot backend",
    long_about = "Answers chat messages with canned rules first, then a hosted language model,\n\
                  or a hosted image model when asked to generate an image.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Enum defining all available top-level commands.
#[derive(Parser, Debug)]
enum Commands {
    /// Run the HTTP chat backend.
    #[command(alias = "s")]
    Serve(commands::serve::ServeArgs),
    /// Chat interactively in the terminal.
    #[command(alias = "c")]
    Chat(commands::chat::ChatArgs),
    /// Generate a single image and save it to a file.
    #[command(alias = "i")]
    Imagine(commands::imagine::ImagineArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let command_result = match cli.command {
        Commands::Serve(args) => commands::serve::handle_serve(args).await,
        Commands::Chat(args) => commands::chat::handle_chat(args).await,
        Commands::Imagine(args) => commands::imagine::handle_imagine(args).await,
    };

    if let Err(e) = command_result {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    fn furhi_cmd() -> Command {
        Command::cargo_bin("furhi").expect("Failed to find furhi binary for testing")
    }
    #[test]
    fn test_main_help_flag() {
        furhi_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"));
    }
    #[test]
    fn test_main_version_flag() {
        furhi_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}
