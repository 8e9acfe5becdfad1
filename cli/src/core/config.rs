//! # Furhi Configuration System
//!
//! File: cli/src/core/config.rs
//!
//! ## Overview
//!
//! This module implements the configuration system for Furhi: where the
//! upstream model APIs live, which models to call, image dimensions, and where
//! the interactive session keeps its history. It also reads the two API
//! credentials from the process environment.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Project-specific `.furhi.toml` in current directory or ancestors
//! 2. User-specific `~/.config/furhi/config.toml`
//! 3. Default values defined in the code
//!
//! Credentials never live in these files. They come from `GROQ_API_KEY` and
//! `REPLICATE_API_TOKEN` (or `REPLICATE_API_KEY`), optionally seeded from a
//! `.env` file by `main`.
//!
//! ## Examples
//!
//! ```toml
//! [completion]
//! model = "llama-3.1-8b-instant"
//!
//! [image]
//! width = 768
//! height = 768
//!
//! [session]
//! history_file = "~/.furhi_history.txt"
//! ```
//!
//! ```rust
//! let cfg = config::load_config()?;
//! let creds = Credentials::from_env();
//! let key = creds.require_groq()?;
//! ```
//!
use crate::core::error::{FurhiError, Result};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Environment variable holding the language-model API key.
pub const GROQ_API_KEY_VAR: &str = "GROQ_API_KEY";
/// Environment variable holding the image-generation API token.
pub const REPLICATE_API_TOKEN_VAR: &str = "REPLICATE_API_TOKEN";
/// Accepted alias for `REPLICATE_API_TOKEN`.
const REPLICATE_API_KEY_VAR: &str = "REPLICATE_API_KEY";

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Settings for the text completion service.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_completion_url")]
    pub api_url: String,
    /// Model identifier sent with every request.
    #[serde(default = "default_completion_model")]
    pub model: String,
}

/// Settings for the image generation service.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    /// Base URL of the Replicate API.
    #[serde(default = "default_image_api_base")]
    pub api_base: String,
    /// `owner/name` of the Replicate model.
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default = "default_image_size")]
    pub width: u32,
    #[serde(default = "default_image_size")]
    pub height: u32,
    /// Delay between polls while a prediction is still running.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up polling after this many seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

/// Settings for the interactive `furhi chat` session.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Flat `You:` / `Bot:` history file (can use ~). Will be expanded.
    #[serde(default = "default_history_file")]
    pub history_file: String,
    /// Directory where generated images are written (can use ~). Will be expanded.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    /// System message that opens every conversation context.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Completion length cap for session replies.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: default_completion_url(),
            model: default_completion_model(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            api_base: default_image_api_base(),
            model: default_image_model(),
            width: default_image_size(),
            height: default_image_size(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_file: default_history_file(),
            image_dir: default_image_dir(),
            system_prompt: default_system_prompt(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_completion_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}
fn default_completion_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_image_api_base() -> String {
    "https://api.replicate.com/v1".to_string()
}
fn default_image_model() -> String {
    "black-forest-labs/flux-dev".to_string()
}
fn default_image_size() -> u32 {
    512
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_poll_timeout_secs() -> u64 {
    120
}
fn default_history_file() -> String {
    "chat_history.txt".to_string()
}
fn default_image_dir() -> String {
    ".".to_string()
}
fn default_system_prompt() -> String {
    "You are a helpful personal assistant.".to_string()
}
fn default_max_tokens() -> u32 {
    200
}

const PROJECT_CONFIG_FILENAME: &str = ".furhi.toml";

/// Loads, merges, expands and validates the effective configuration.
pub fn load_config() -> Result<Config> {
    let current_dir = env::current_dir().context("Failed to get current directory")?;
    let user_config = load_user_config()?;
    let project_config = match find_project_config_path(&current_dir) {
        Some(path) => {
            info!("Loading project configuration from: {}", path.display());
            Some(load_config_from_path(&path)?)
        }
        None => {
            debug!("No project configuration file (.furhi.toml) found in current directory or ancestors.");
            None
        }
    };
    let mut merged_config = merge_configs(user_config.unwrap_or_default(), project_config);
    expand_config_paths(&mut merged_config);
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "Furhi", "furhi") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

/// Walks up from `start` looking for `.furhi.toml`, stopping at a `.git` root.
fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path: &Path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Takes each project value that differs from its default, otherwise the user value.
fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project = match project {
        Some(p) => p,
        None => return user,
    };

    fn pick<T: PartialEq>(project: T, user: T, default: T) -> T {
        if project != default {
            project
        } else {
            user
        }
    }

    Config {
        completion: CompletionConfig {
            api_url: pick(
                project.completion.api_url,
                user.completion.api_url,
                default_completion_url(),
            ),
            model: pick(
                project.completion.model,
                user.completion.model,
                default_completion_model(),
            ),
        },
        image: ImageConfig {
            api_base: pick(
                project.image.api_base,
                user.image.api_base,
                default_image_api_base(),
            ),
            model: pick(project.image.model, user.image.model, default_image_model()),
            width: pick(project.image.width, user.image.width, default_image_size()),
            height: pick(project.image.height, user.image.height, default_image_size()),
            poll_interval_ms: pick(
                project.image.poll_interval_ms,
                user.image.poll_interval_ms,
                default_poll_interval_ms(),
            ),
            poll_timeout_secs: pick(
                project.image.poll_timeout_secs,
                user.image.poll_timeout_secs,
                default_poll_timeout_secs(),
            ),
        },
        session: SessionConfig {
            history_file: pick(
                project.session.history_file,
                user.session.history_file,
                default_history_file(),
            ),
            image_dir: pick(
                project.session.image_dir,
                user.session.image_dir,
                default_image_dir(),
            ),
            system_prompt: pick(
                project.session.system_prompt,
                user.session.system_prompt,
                default_system_prompt(),
            ),
            max_tokens: pick(
                project.session.max_tokens,
                user.session.max_tokens,
                default_max_tokens(),
            ),
        },
    }
}

fn expand_config_paths(config: &mut Config) {
    config.session.history_file = shellexpand::tilde(&config.session.history_file).into_owned();
    config.session.image_dir = shellexpand::tilde(&config.session.image_dir).into_owned();
    debug!(
        "Expanded session paths: history={}, images={}",
        config.session.history_file, config.session.image_dir
    );
}

fn validate_config(config: &Config) -> Result<()> {
    for (name, url) in [
        ("completion.api_url", &config.completion.api_url),
        ("image.api_base", &config.image.api_base),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!(FurhiError::Config(format!(
                "{} must be an http(s) URL, got '{}'.",
                name, url
            ))));
        }
    }
    if config.completion.model.trim().is_empty() {
        return Err(anyhow!(FurhiError::Config(
            "completion.model cannot be empty.".to_string()
        )));
    }
    if config.image.model.trim().is_empty() || !config.image.model.contains('/') {
        return Err(anyhow!(FurhiError::Config(format!(
            "image.model must look like 'owner/name', got '{}'.",
            config.image.model
        ))));
    }
    if config.image.width == 0 || config.image.height == 0 {
        return Err(anyhow!(FurhiError::Config(format!(
            "Invalid image dimensions {}x{}.",
            config.image.width, config.image.height
        ))));
    }
    if config.image.poll_interval_ms == 0 {
        return Err(anyhow!(FurhiError::Config(
            "image.poll_interval_ms must be greater than zero.".to_string()
        )));
    }
    if config.session.history_file.trim().is_empty() {
        return Err(anyhow!(FurhiError::Config(
            "session.history_file cannot be empty.".to_string()
        )));
    }
    Ok(())
}

/// API credentials read from the process environment at startup.
#[derive(Clone, Default)]
pub struct Credentials {
    pub groq_api_key: Option<String>,
    pub replicate_api_token: Option<String>,
}

// Keeps secrets out of `{:?}` logging.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "<set>"))
            .field(
                "replicate_api_token",
                &self.replicate_api_token.as_ref().map(|_| "<set>"),
            )
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            groq_api_key: non_empty_env(GROQ_API_KEY_VAR),
            replicate_api_token: non_empty_env(REPLICATE_API_TOKEN_VAR)
                .or_else(|| non_empty_env(REPLICATE_API_KEY_VAR)),
        }
    }

    /// Fails when the language-model key is absent.
    pub fn require_groq(&self) -> Result<&str> {
        self.groq_api_key.as_deref().ok_or_else(|| {
            anyhow!(FurhiError::MissingCredential {
                var: GROQ_API_KEY_VAR
            })
        })
    }

    /// Fails when the image-generation token is absent.
    pub fn require_replicate(&self) -> Result<&str> {
        self.replicate_api_token.as_deref().ok_or_else(|| {
            anyhow!(FurhiError::MissingCredential {
                var: REPLICATE_API_TOKEN_VAR
            })
        })
    }

    /// Logs a warning for each absent credential.
    pub fn warn_missing(&self) {
        if self.groq_api_key.is_none() {
            warn!(
                "{} is not set; text replies will report an API error.",
                GROQ_API_KEY_VAR
            );
        }
        if self.replicate_api_token.is_none() {
            warn!(
                "{} is not set; image requests will fail.",
                REPLICATE_API_TOKEN_VAR
            );
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
