//! # Furhi Chat HTTP Server
//!
//! File: cli/src/commands/serve/mod.rs
//!
//! ## Overview
//!
//! `furhi serve` exposes the chat router over HTTP:
//! - `POST /chat` with `{"message": "...", "prompt": "..."}`
//! - `GET /test` for an image generation diagnostic
//! - an optional static frontend on every other path
//!
//! ## Architecture
//!
//! - `config.rs`: command-line arguments and `.furhi-serve.toml` merging
//! - `server_logic.rs`: Axum routes, middleware, port fallback and shutdown
//!
//! Missing API credentials are logged as warnings but do not stop the server.
//! Affected requests answer with an error text instead.
//!
//! ## Examples
//!
//! ```bash
//! # Listen on the default 127.0.0.1:8000
//! furhi serve
//!
//! # Accept connections from other machines and serve a frontend
//! furhi serve --host 0.0.0.0 --port 9000 --frontend ./Frontend
//! ```
//!
use super::build_chat_router;
use crate::core::{
    config::{load_config, Credentials},
    error::Result,
};
use tracing::info;

pub use config::ServeArgs;

pub mod config;
pub mod server_logic;

/// # Handle Serve Command (`handle_serve`)
///
/// Loads the application and server configuration, builds the chat router
/// and runs the HTTP server until shutdown.
///
/// ## Errors
///
/// Returns an error if configuration is invalid, the frontend directory is
/// missing, or the server cannot bind.
pub async fn handle_serve(args: ServeArgs) -> Result<()> {
    info!("Handling serve command with args: {:?}", args);

    let app_config = load_config()?;
    let credentials = Credentials::from_env();
    credentials.warn_missing();

    let server_config = config::load_and_merge_config(args).await?;
    info!("Effective server configuration: {:?}", server_config);

    let router = build_chat_router(&app_config, &credentials, None)?;
    server_logic::run_server(server_config, server_logic::AppState::new(router)).await
}
