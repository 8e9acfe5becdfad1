//! # Furhi HTTP Server Configuration
//!
//! File: cli/src/commands/serve/config.rs
//!
//! ## Overview
//!
//! Settings for `furhi serve`, in precedence order:
//! 1. Flags given on the command line
//! 2. `.furhi-serve.toml` in the working directory
//! 3. Built-in defaults (127.0.0.1:8000, CORS on, no frontend)
//!
//! ## Examples
//!
//! `.furhi-serve.toml`:
//!
//! ```toml
//! port = 9000
//! host = "0.0.0.0"
//! enable_cors = true
//! frontend_dir = "../Frontend"
//! ```
//!
//! ```rust
//! let config = load_and_merge_config(args).await?;
//! assert!(config.enable_cors);
//! ```
//!
use crate::core::error::Result;
use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::net::IpAddr;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Server settings file looked up in the working directory.
const CONFIG_FILE_NAME: &str = ".furhi-serve.toml";

/// # Server Command Arguments (`ServeArgs`)
///
/// Defines the command-line arguments accepted by `furhi serve`.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Port to listen on [default: 8000]. The next free port is used if it
    /// is taken.
    #[arg(long, short)]
    pub port: Option<u16>,

    /// IP address to bind [default: 127.0.0.1].
    /// Use `0.0.0.0` to accept connections from other machines.
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Do not send CORS headers.
    /// By default every origin, method and header is allowed.
    #[arg(long)]
    pub no_cors: bool,

    /// Serves a static chat frontend from this directory for any path
    /// other than the API routes.
    #[arg(long, value_name = "DIR")]
    pub frontend: Option<PathBuf>,
}

/// # Effective Server Configuration (`ServerConfig`)
///
/// Final settings after merging command-line arguments, `.furhi-serve.toml`
/// and defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: IpAddr,
    pub enable_cors: bool,
    /// Resolved, absolute frontend directory, if one is served.
    pub frontend_dir: Option<PathBuf>,
}

/// Deserialization target for `.furhi-serve.toml`; every field optional.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    host: Option<String>, // Read as string to handle parsing errors gracefully
    enable_cors: Option<bool>,
    frontend_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            enable_cors: true,
            frontend_dir: None,
        }
    }
}

/// # Resolve Server Settings (`load_and_merge_config`)
///
/// Reads `.furhi-serve.toml` from the current working directory (if present)
/// and merges it with `args`. Flags given on the command line win, even when
/// they repeat a default value; omitted flags yield to the file.
///
/// ## Errors
///
/// Returns an error if:
/// - The configuration file exists but cannot be read or parsed.
/// - The frontend directory does not exist or is not a directory.
pub async fn load_and_merge_config(args: ServeArgs) -> Result<ServerConfig> {
    let search_dir = env::current_dir().context("Failed to get current working directory")?;
    merge_with_dir(args, &search_dir).await
}

async fn merge_with_dir(args: ServeArgs, search_dir: &Path) -> Result<ServerConfig> {
    let mut effective = ServerConfig::from_args(&args);

    if let Some(file_config) = load_config_from_dir(search_dir)? {
        info!(
            "Loaded settings from {}",
            search_dir.join(CONFIG_FILE_NAME).display()
        );
        if args.port.is_none() {
            effective.port = file_config.port;
        }
        if args.host.is_none() {
            effective.host = file_config.host;
        }
        if !args.no_cors {
            effective.enable_cors = file_config.enable_cors;
        }
        if args.frontend.is_none() {
            effective.frontend_dir = file_config.frontend_dir;
        }
    } else {
        debug!("No {} in {}", CONFIG_FILE_NAME, search_dir.display());
    }

    effective.resolve_frontend_dir().await?;
    Ok(effective)
}

/// Loads `.furhi-serve.toml` from `search_dir`. `Ok(None)` when absent.
/// A relative `frontend_dir` is resolved against the file's directory.
fn load_config_from_dir(search_dir: &Path) -> Result<Option<ServerConfig>> {
    let config_path = search_dir.join(CONFIG_FILE_NAME);
    if !config_path.is_file() {
        return Ok(None);
    }

    debug!("Reading {}", config_path.display());
    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let file_config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

    let defaults = ServerConfig::default();
    let host = match file_config.host {
        Some(ref host_str) => host_str.parse().unwrap_or_else(|e| {
            warn!(
                "Ignoring host '{}' in {} ({}); using {}",
                host_str, CONFIG_FILE_NAME, e, defaults.host
            );
            defaults.host
        }),
        None => defaults.host,
    };
    let frontend_dir = file_config.frontend_dir.map(|dir| {
        let dir = PathBuf::from(shellexpand::tilde(&dir).into_owned());
        if dir.is_relative() {
            search_dir.join(dir)
        } else {
            dir
        }
    });

    Ok(Some(ServerConfig {
        port: file_config.port.unwrap_or(defaults.port),
        host,
        enable_cors: file_config.enable_cors.unwrap_or(defaults.enable_cors),
        frontend_dir,
    }))
}

impl ServerConfig {
    fn from_args(args: &ServeArgs) -> Self {
        let defaults = Self::default();
        Self {
            port: args.port.unwrap_or(defaults.port),
            host: args.host.unwrap_or(defaults.host),
            enable_cors: !args.no_cors,
            frontend_dir: args.frontend.clone(),
        }
    }

    /// Canonicalizes the frontend directory and checks that it is a directory.
    async fn resolve_frontend_dir(&mut self) -> Result<()> {
        let Some(dir) = self.frontend_dir.as_ref() else {
            return Ok(());
        };
        let canonical = tokio::fs::canonicalize(dir).await.with_context(|| {
            format!(
                "Frontend directory '{}' could not be found or accessed",
                dir.display()
            )
        })?;
        let metadata = tokio::fs::metadata(&canonical)
            .await
            .with_context(|| format!("Failed to get metadata for '{}'", canonical.display()))?;
        if !metadata.is_dir() {
            anyhow::bail!("Frontend path is not a directory: {}", canonical.display());
        }
        debug!("Resolved frontend directory to: {}", canonical.display());
        self.frontend_dir = Some(canonical);
        Ok(())
    }
}
