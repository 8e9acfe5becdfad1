//! # Furhi Chat History Store
//!
//! File: cli/src/services/history.rs
//!
//! ## Overview
//!
//! Persists the interactive session's turns to a flat text file so a later
//! `furhi chat` can pick the conversation back up:
//!
//! ```text
//! You: what's a good name for a cat?
//! Bot: How about Miso?
//! ```
//!
//! Every turn appends one `You:` line and one `Bot:` line. On load, lines
//! without either prefix are treated as continuations of the previous message,
//! so multi-line model replies survive a reload. A continuation line that
//! would itself start with `You: `, `Bot: ` or `\` is written with a leading
//! `\`, which is stripped again on load.
//!
use crate::bot::context::{ChatMessage, Role};
use crate::core::error::{FurhiError, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const USER_PREFIX: &str = "You: ";
const BOT_PREFIX: &str = "Bot: ";
const ESCAPE: char = '\\';

/// Append-only `You:` / `Bot:` history file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every persisted turn. A missing file is an empty history.
    pub async fn load(&self) -> Result<Vec<ChatMessage>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("No history file at {}", self.path.display());
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read history file: {}", self.path.display()))?;
        let messages = parse_history(&content);
        info!(
            "Loaded {} message(s) from {}",
            messages.len(),
            self.path.display()
        );
        Ok(messages)
    }

    /// Appends one user/bot turn pair, creating the file if needed.
    pub async fn append(&self, user_input: &str, bot_reply: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                FurhiError::History(format!("cannot open {}: {}", self.path.display(), e))
            })?;
        let entry = format!(
            "{USER_PREFIX}{}\n{BOT_PREFIX}{}\n",
            escape_continuations(user_input),
            escape_continuations(bot_reply)
        );
        file.write_all(entry.as_bytes())
            .await
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        file.flush().await?;
        Ok(())
    }

    /// Deletes the history file if it exists.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Cleared history file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FurhiError::History(format!(
                "cannot remove {}: {}",
                self.path.display(),
                e
            ))
            .into()),
        }
    }
}

/// Parses history text into chat turns.
fn parse_history(content: &str) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = Vec::new();
    for line in content.lines() {
        if let Some(text) = line.strip_prefix(USER_PREFIX) {
            messages.push(ChatMessage::new(Role::User, text));
        } else if let Some(text) = line.strip_prefix(BOT_PREFIX) {
            messages.push(ChatMessage::new(Role::Assistant, text));
        } else if let Some(last) = messages.last_mut() {
            last.content.push('\n');
            last.content.push_str(line.strip_prefix(ESCAPE).unwrap_or(line));
        }
    }
    messages
}

/// Marks continuation lines that would otherwise parse as a new turn.
fn escape_continuations(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            escaped.push('\n');
            if line.starts_with(USER_PREFIX) || line.starts_with(BOT_PREFIX) || line.starts_with(ESCAPE) {
                escaped.push(ESCAPE);
            }
        }
        escaped.push_str(line);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_alternating_lines() {
        let messages = parse_history("You: hi\nBot: hello\nYou: bye\nBot: ciao\n");
        assert_eq!(
            messages,
            vec![
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
                ChatMessage::user("bye"),
                ChatMessage::assistant("ciao"),
            ]
        );
    }

    #[test]
    fn parse_keeps_continuation_lines() {
        let messages = parse_history("garbage before\nYou: list\nBot: 1. a\n2. b\n\n3. c\n");
        assert_eq!(
            messages,
            vec![ChatMessage::user("list"), ChatMessage::assistant("1. a\n2. b\n\n3. c")]
        );
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let store = HistoryStore::new(dir.path().join("none.txt"));
        assert!(store.load().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn append_then_load() -> Result<()> {
        let dir = TempDir::new()?;
        let store = HistoryStore::new(dir.path().join("chat_history.txt"));

        store.append("hello", "Hello! How can I help you today?").await?;
        store.append("poem please", "Roses are red\nViolets are blue").await?;

        let raw = std::fs::read_to_string(store.path())?;
        assert!(raw.starts_with("You: hello\nBot: Hello! How can I help you today?\n"));

        let messages = store.load().await?;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2], ChatMessage::user("poem please"));
        assert_eq!(
            messages[3],
            ChatMessage::assistant("Roses are red\nViolets are blue")
        );
        Ok(())
    }

    #[tokio::test]
    async fn prefixed_reply_lines_stay_in_one_turn() -> Result<()> {
        let dir = TempDir::new()?;
        let store = HistoryStore::new(dir.path().join("chat_history.txt"));
        let reply = "A transcript:\nYou: hi\nBot: hello\n\\path\\to";

        store.append("show a dialogue", reply).await?;
        store.append("thanks", "You're welcome! 😊").await?;

        let raw = std::fs::read_to_string(store.path())?;
        assert!(raw.contains("\n\\You: hi\n\\Bot: hello\n\\\\path"));

        let messages = store.load().await?;
        assert_eq!(
            messages,
            vec![
                ChatMessage::user("show a dialogue"),
                ChatMessage::assistant(reply),
                ChatMessage::user("thanks"),
                ChatMessage::assistant("You're welcome! 😊"),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn clear_removes_file_and_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let store = HistoryStore::new(dir.path().join("chat_history.txt"));
        store.append("a", "b").await?;
        assert!(store.path().exists());

        store.clear().await?;
        assert!(!store.path().exists());
        store.clear().await?;
        Ok(())
    }
}
