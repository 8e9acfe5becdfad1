//! # Furhi Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! This module aggregates the core infrastructure components shared by every
//! Furhi command:
//! - `config`: Configuration loading, merging, validation and API credentials
//! - `error`: Error types and the crate-wide `Result` alias
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::config::{self, Credentials};
//! use crate::core::error::{FurhiError, Result};
//! ```
//!
pub mod config;
pub mod error;
