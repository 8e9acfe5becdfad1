//! # Furhi Request and Reply Payloads
//!
//! File: cli/src/bot/reply.rs
//!
//! Wire shapes for `POST /chat`. A request carries the user's `message` and,
//! for "regenerate image" requests, the `prompt` echoed back from an earlier
//! multimodal reply. `message` may be missing or `null`.
//! Replies come in two families:
//!
//! ```json
//! {"source": "rule", "response": "Hello! How can I help you today?"}
//! {"type": "text", "content": "Paris is the capital of France."}
//! {"type": "multimodal", "content": {"text": "...", "images": ["data:image/png;base64,..."], "prompt": "..."}}
//! ```
//!
use serde::{Deserialize, Serialize};

/// Body of a chat request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// Original generation prompt, only read for "regenerate image" messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            prompt: None,
        }
    }

    /// The message text, empty when absent.
    pub fn text(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    #[cfg(test)]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

/// Reply produced by the router for a single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Answered by a canned rule.
    Sourced(SourcedReply),
    /// Answered by the language model or the image service.
    Typed(TypedReply),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum SourcedReply {
    Rule { response: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum TypedReply {
    Text(String),
    Multimodal(MultimodalContent),
}

/// Descriptive text plus generated images and the prompt that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultimodalContent {
    pub text: String,
    pub images: Vec<String>,
    pub prompt: String,
}

impl Reply {
    pub fn rule(response: impl Into<String>) -> Self {
        Reply::Sourced(SourcedReply::Rule {
            response: response.into(),
        })
    }

    pub fn text(content: impl Into<String>) -> Self {
        Reply::Typed(TypedReply::Text(content.into()))
    }

    pub fn multimodal(text: impl Into<String>, images: Vec<String>, prompt: impl Into<String>) -> Self {
        Reply::Typed(TypedReply::Multimodal(MultimodalContent {
            text: text.into(),
            images,
            prompt: prompt.into(),
        }))
    }

    /// The human-readable part of the reply.
    pub fn display_text(&self) -> &str {
        match self {
            Reply::Sourced(SourcedReply::Rule { response }) => response,
            Reply::Typed(TypedReply::Text(content)) => content,
            Reply::Typed(TypedReply::Multimodal(content)) => &content.text,
        }
    }

    /// Generated images carried by the reply, if any.
    pub fn images(&self) -> &[String] {
        match self {
            Reply::Typed(TypedReply::Multimodal(content)) => &content.images,
            _ => &[],
        }
    }

    pub fn is_rule(&self) -> bool {
        matches!(self, Reply::Sourced(_))
    }
}
