//! # Furhi Interactive Chat
//!
//! File: cli/src/commands/chat/mod.rs
//!
//! ## Overview
//!
//! `furhi chat` runs a terminal conversation with memory. Previous turns are
//! loaded from a flat history file, sent to the language model as context,
//! and every new turn is appended to the same file.
//!
//! Special inputs:
//! - `/clear_chat_history` deletes the history file and resets the context
//! - `bye`, `exit` or `quit` end the session
//!
//! Image requests work as on the HTTP server; generated images are written
//! to the configured image directory.
//!
//! ## Examples
//!
//! ```bash
//! furhi chat
//! furhi chat --history-file ~/.furhi_history.txt --image-dir ./images
//! ```
//!
use super::build_chat_router;
use crate::bot::context::ConversationContext;
use crate::core::config::{load_config, Credentials};
use crate::core::error::Result;
use crate::services::history::HistoryStore;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

pub mod session;

/// # Chat Command Arguments (`ChatArgs`)
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// History file to load and append to (overrides `session.history_file`).
    #[arg(long, value_name = "FILE")]
    pub history_file: Option<PathBuf>,

    /// Directory for generated images (overrides `session.image_dir`).
    #[arg(long, value_name = "DIR")]
    pub image_dir: Option<PathBuf>,
}

/// # Handle Chat Command (`handle_chat`)
///
/// Requires `GROQ_API_KEY`. Loads the history, then runs the session on
/// stdin/stdout until the user leaves or input ends.
pub async fn handle_chat(args: ChatArgs) -> Result<()> {
    info!("Handling chat command with args: {:?}", args);

    let config = load_config()?;
    let credentials = Credentials::from_env();
    credentials.require_groq()?;

    let router = build_chat_router(&config, &credentials, Some(config.session.max_tokens))?;

    let history_path = args
        .history_file
        .unwrap_or_else(|| PathBuf::from(&config.session.history_file));
    let image_dir = args
        .image_dir
        .unwrap_or_else(|| PathBuf::from(&config.session.image_dir));
    let store = HistoryStore::new(history_path);

    let history = store.load().await?;
    let context = ConversationContext::with_history(&config.session.system_prompt, history);

    println!();
    println!(
        "🤖 Furhi personal assistant with memory (type 'bye' to exit, '{}' to reset)",
        session::CLEAR_COMMAND
    );
    if context.turn_count() > 0 {
        println!("📜 Restored {} message(s) from {}", context.turn_count(), store.path().display());
    }
    println!();

    let reader = tokio::io::BufReader::new(tokio::io::stdin());
    let mut writer = std::io::stdout();
    session::run_session(&router, &store, context, &image_dir, reader, &mut writer).await?;
    Ok(())
}
