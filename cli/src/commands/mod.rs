//! # Furhi Command Modules
//!
//! File: cli/src/commands/mod.rs
//!
//! ## Overview
//!
//! This module aggregates the top-level commands of the Furhi CLI:
//!
//! - `serve`: HTTP chat backend (`POST /chat`, `GET /test`)
//! - `chat`: interactive terminal session with persistent history
//! - `imagine`: one-shot image generation to a file
//!
//! Each command defines its own arguments structure and handler function.
//! `build_chat_router` wires the shared collaborators (rules, language model,
//! image service) the same way for every command that needs them.
//!
use crate::bot::router::ChatRouter;
use crate::bot::rules::RuleSet;
use crate::core::config::{Config, Credentials};
use crate::core::error::Result;
use crate::services::completion::GroqClient;
use crate::services::image::ReplicateClient;
use std::sync::Arc;
use tracing::debug;

/// Interactive terminal chat session.
pub mod chat;
/// One-shot image generation.
pub mod imagine;
/// HTTP chat backend.
pub mod serve;

/// Builds a `ChatRouter` backed by the standard rules, Groq and Replicate.
///
/// `max_tokens` caps completion length when set; the HTTP server leaves it
/// unset so the model default applies.
pub fn build_chat_router(
    config: &Config,
    credentials: &Credentials,
    max_tokens: Option<u32>,
) -> Result<ChatRouter> {
    let rules = RuleSet::standard()?;
    debug!("Loaded {} canned rules", rules.len());

    let mut completion = GroqClient::new(&config.completion, credentials.groq_api_key.clone());
    if let Some(max_tokens) = max_tokens {
        completion = completion.with_max_tokens(max_tokens);
    }
    let images = ReplicateClient::new(&config.image, credentials.replicate_api_token.clone());

    Ok(ChatRouter::new(rules, Arc::new(completion), Arc::new(images)))
}
