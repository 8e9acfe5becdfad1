//! # Furhi CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration test crates under `cli/tests/`.
//! Every command built here runs in an isolated working directory with an
//! isolated home, and without API credentials, so results never depend on the
//! developer's `.env`, config files or real keys.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::path::Path;

const CREDENTIAL_VARS: [&str; 3] = ["GROQ_API_KEY", "REPLICATE_API_TOKEN", "REPLICATE_API_KEY"];

/// # Get Furhi Command (`furhi_cmd`)
///
/// Creates an `assert_cmd::Command` for the compiled `furhi` binary.
///
/// ## Panics
/// Panics if the binary cannot be found via `Command::cargo_bin`.
pub fn furhi_cmd() -> Command {
    Command::cargo_bin("furhi").expect("Failed to find furhi binary for testing")
}

/// `furhi` running in `dir`, with `dir` as its home and no credentials set.
pub fn isolated_cmd(dir: &Path) -> Command {
    let mut cmd = furhi_cmd();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG");
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd
}
