//! # Furhi HTTP Server Implementation
//!
//! File: cli/src/commands/serve/server_logic.rs
//!
//! ## Overview
//!
//! This module implements the HTTP surface of the chatbot backend:
//! - `POST /chat`: routes a `{message, prompt?}` body through the `ChatRouter`
//! - `GET /test`: fixed-prompt image generation for diagnostics
//! - Optional static frontend served for every other path
//! - Permissive CORS (unless disabled), request tracing, port fallback and
//!   graceful shutdown
//!
//! ## Architecture
//!
//! 1. Set up the Axum router with the API routes and middleware
//! 2. Find an available port if the requested one is in use
//! 3. Serve until Ctrl+C or SIGTERM
//!
//! Handlers share one `ChatRouter` through `AppState`. The router holds no
//! mutable state, so requests are processed without any locking.
//!
use super::config::ServerConfig;
use crate::bot::reply::{ChatRequest, Reply};
use crate::bot::router::ChatRouter;
use crate::core::error::Result;
use crate::services::image::ImageResult;
use anyhow::Context;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, error, info, warn, Level};

/// Prompt used by the `GET /test` diagnostic endpoint.
pub const DIAGNOSTIC_PROMPT: &str = "sunset back in mountains";

/// Ports tried, starting at the configured one, before giving up.
const PORT_ATTEMPTS: u8 = 10;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    router: Arc<ChatRouter>,
}

impl AppState {
    pub fn new(router: ChatRouter) -> Self {
        Self {
            router: Arc::new(router),
        }
    }
}

/// # Run HTTP Server (`run_server`)
///
/// Binds the first free port at or after `config.port`, prints connection
/// details and serves until Ctrl+C or SIGTERM.
///
/// ## Errors
///
/// - No available port within the allowed attempts.
/// - Binding the `TcpListener` fails.
/// - The Axum server encounters a fatal error.
pub async fn run_server(config: ServerConfig, state: AppState) -> Result<()> {
    let addr = find_available_port(config.host, config.port, PORT_ATTEMPTS).await?;

    let app = create_app(&config, state);

    println!("\n{}", "=".repeat(65));
    println!("🤖 Furhi chat backend");
    println!("🌐 Chat endpoint:     POST http://{}/chat", addr);
    println!("🧪 Image diagnostic:  GET  http://{}/test", addr);
    if let Some(dir) = &config.frontend_dir {
        println!("📂 Frontend:          {}", dir.display());
    }
    println!("🔒 CORS enabled:      {}", config.enable_cors);
    println!("{}\n", "=".repeat(65));

    info!("Starting server on {}", addr);
    println!("Press Ctrl+C to stop.");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    println!("\nFurhi backend stopped.");
    Ok(())
}

/// `POST /chat`
async fn chat_handler(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Json<Reply> {
    info!("Incoming chat message ({} chars)", request.text().len());
    let reply = state.router.route(&request, None).await;
    debug!(
        "Answered by {}",
        if reply.is_rule() { "rule" } else { "upstream service" }
    );
    Json(reply)
}

/// `GET /test`
async fn test_image_handler(State(state): State<AppState>) -> Json<ImageResult> {
    info!("Running image diagnostic with prompt '{}'", DIAGNOSTIC_PROMPT);
    Json(state.router.images().generate(DIAGNOSTIC_PROMPT).await)
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM. Used with `with_graceful_shutdown`.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C received, shutting down"),
            Err(e) => {
                error!("Could not listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("SIGTERM received, shutting down");
            }
            Err(e) => {
                error!(
                    "Could not listen for SIGTERM ({}); only Ctrl+C will stop the server",
                    e
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// # Find Available Port (`find_available_port`)
///
/// Tries `start_port` and up to `max_attempts - 1` following ports, returning
/// the first address that can be bound.
async fn find_available_port(
    host: IpAddr,
    start_port: u16,
    max_attempts: u8,
) -> Result<SocketAddr> {
    let mut current_port = start_port;

    for attempt in 0..max_attempts {
        let addr = SocketAddr::new(host, current_port);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                drop(listener);
                if attempt > 0 {
                    info!(
                        "Port {} busy, using {} instead",
                        start_port, current_port
                    );
                }
                return Ok(addr);
            }
            Err(e) => {
                warn!(
                    "Port {} on {} unavailable ({}), attempt {}/{}",
                    current_port,
                    host,
                    e,
                    attempt + 1,
                    max_attempts
                );
                current_port = match current_port.checked_add(1) {
                    Some(next) => next,
                    None => break,
                };
            }
        }
    }

    anyhow::bail!(
        "No free port on {} in {}..{} ({} attempts)",
        host,
        start_port,
        start_port.saturating_add(u16::from(max_attempts)),
        max_attempts
    )
}

/// # Create Axum Application (`create_app`)
///
/// Builds the router: API routes, optional frontend fallback, tracing and
/// CORS layers.
fn create_app(config: &ServerConfig, state: AppState) -> Router {
    let cors_layer = if config.enable_cors {
        debug!("CORS: allowing any origin");
        CorsLayer::permissive()
    } else {
        debug!("CORS: no cross-origin headers");
        CorsLayer::new()
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::default().include_headers(true))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let mut app = Router::new()
        .route("/chat", post(chat_handler))
        .route("/test", get(test_image_handler))
        .with_state(state);

    if let Some(dir) = &config.frontend_dir {
        info!("Serving frontend from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(trace_layer)
            .layer(cors_layer),
    )
}

// --- Unit Tests ---
