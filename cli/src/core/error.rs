//! # Furhi Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout the Furhi backend.
//! Upstream failures (language model, image generation) are described by
//! `FurhiError` variants so the request router can turn them into user-facing
//! text. Command-level code propagates everything through `anyhow`.
//!
//! ## Architecture
//!
//! The error system consists of two main components:
//! - `FurhiError`: A custom error enum using `thiserror` for specific error types
//! - `Result<T>`: A type alias for `anyhow::Result<T>` for flexible error handling
//!
//! The error types cover various domains:
//! - Configuration and missing credentials
//! - Upstream transport and HTTP status failures
//! - Malformed upstream responses
//! - Chat history persistence
//!
//! ## Examples
//!
//! ```rust
//! // Return a specific error type
//! let key = api_key.ok_or(FurhiError::MissingCredential { var: "GROQ_API_KEY" })?;
//!
//! // Pattern matching on error types
//! match err.downcast_ref::<FurhiError>() {
//!     Some(FurhiError::UpstreamStatus { status, .. }) => warn!("status {}", status),
//!     _ => {}
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for the Furhi application.
#[derive(Error, Debug)]
pub enum FurhiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {var} is not set")]
    MissingCredential { var: &'static str },

    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} API returned {status}")]
    UpstreamStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected {service} response: {detail}")]
    UnexpectedResponse {
        service: &'static str,
        detail: String,
    },

    #[error("Image generation failed: {0}")]
    ImageGeneration(String),

    #[error("Chat history error: {0}")]
    History(String),
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = FurhiError::Config("Missing setting 'foo'".to_string());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: Missing setting 'foo'"
        );

        let missing = FurhiError::MissingCredential {
            var: "GROQ_API_KEY",
        };
        assert_eq!(
            missing.to_string(),
            "Missing credential: GROQ_API_KEY is not set"
        );

        let status = FurhiError::UpstreamStatus {
            service: "Groq",
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(status.to_string(), "Groq API returned 500");

        let unexpected = FurhiError::UnexpectedResponse {
            service: "Replicate",
            detail: "no output".into(),
        };
        assert_eq!(
            unexpected.to_string(),
            "Unexpected Replicate response: no output"
        );
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = FurhiError::History("disk full".into()).into();
        assert!(matches!(
            err.downcast_ref::<FurhiError>(),
            Some(FurhiError::History(_))
        ));
    }
}
