//! # Furhi CLI Chat Integration Tests
//!
//! File: cli/tests/chat.rs
//!
//! ## Overview
//!
//! Integration tests for `furhi chat` that need no network access: startup
//! failures caused by missing credentials or invalid configuration.
//!

mod common;
use common::*;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_chat_requires_groq_key() {
    let dir = tempdir().expect("Failed to create temp dir");
    isolated_cmd(dir.path())
        .arg("chat")
        .write_stdin("hello\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GROQ_API_KEY is not set"));
}

#[test]
fn test_chat_rejects_invalid_project_config() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join(".furhi.toml"), "[image]\nwidth = 0\n").unwrap();
    isolated_cmd(dir.path())
        .arg("chat")
        .env("GROQ_API_KEY", "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid image dimensions"));
}

#[test]
fn test_chat_rejects_unknown_config_keys() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join(".furhi.toml"), "[session]\ncolour = \"blue\"\n").unwrap();
    isolated_cmd(dir.path())
        .arg("chat")
        .env("GROQ_API_KEY", "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse TOML"));
}

/// Rules and session commands never reach the network, so a whole session
/// can run with a dummy key.
#[test]
fn test_chat_rule_only_session() {
    let dir = tempdir().expect("Failed to create temp dir");
    isolated_cmd(dir.path())
        .arg("chat")
        .env("GROQ_API_KEY", "test-key")
        .write_stdin("hello\nthanks\nbye\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bot: Hello! How can I help you today?"))
        .stdout(predicate::str::contains("Bot: Have a nice day!"));

    let history = std::fs::read_to_string(dir.path().join("chat_history.txt")).unwrap();
    assert!(history.starts_with("You: hello\nBot: Hello! How can I help you today?\n"));
    assert!(history.ends_with("You: bye\nBot: Have a nice day! 👋\n"));
}

#[test]
fn test_chat_clear_removes_history_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let history = dir.path().join("notes.txt");
    std::fs::write(&history, "You: old\nBot: turn\n").unwrap();
    isolated_cmd(dir.path())
        .args(["chat", "--history-file", "notes.txt"])
        .env("GROQ_API_KEY", "test-key")
        .write_stdin("/clear_chat_history\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 2 message(s)"))
        .stdout(predicate::str::contains("Chat history cleared"));
    assert!(!history.exists());
}
