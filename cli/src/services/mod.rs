//! # Furhi External Services
//!
//! File: cli/src/services/mod.rs
//!
//! ## Overview
//!
//! Collaborators the request router and the commands talk to:
//!
//! - `completion`: hosted language model (`TextCompletion`, `GroqClient`)
//! - `image`: hosted image generation (`ImageGenerator`, `ReplicateClient`)
//!   plus data URI helpers
//! - `history`: flat-file chat history for the interactive session
//!
//! The completion and image services sit behind traits so the router can be
//! exercised with in-process stubs.
//!
pub mod completion;
pub mod history;
pub mod image;
