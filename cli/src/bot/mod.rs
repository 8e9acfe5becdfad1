//! # Furhi Chat Logic
//!
//! File: cli/src/bot/mod.rs
//!
//! ## Overview
//!
//! The part of Furhi that decides what to say:
//!
//! - `rules`: ordered canned replies (Rule Matcher)
//! - `router`: rule / image / text dispatch (Request Router)
//! - `context`: chat turns and the conversation context sent upstream
//! - `reply`: request and reply payloads
//!
//! Nothing here performs I/O directly; upstream calls go through the traits
//! in `crate::services`.
//!
pub mod context;
pub mod reply;
pub mod router;
pub mod rules;
