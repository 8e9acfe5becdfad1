//! # Furhi Request Router
//!
//! File: cli/src/bot/router.rs
//!
//! ## Overview
//!
//! Decides how each incoming message is answered. Branches are tried in a
//! fixed priority order:
//!
//! 1. **Rule**: a canned rule matches → `{source: rule, response}`. This wins
//!    even when the message would also trigger image generation.
//! 2. **Image**: the message contains `generate image` (any case) → the image
//!    service is called with a prompt derived from the message, or, for
//!    `regenerate image` requests, with the caller-supplied `prompt` field.
//! 3. **Text**: everything else goes to the language model, together with the
//!    conversation context when one is supplied.
//!
//! Upstream failures never escape: they become text replies such as
//! `Error: Groq API returned 500` or `Error calling Groq API: <detail>`.
//! Nothing is retried.
//!
//! ## Examples
//!
//! ```rust
//! let router = ChatRouter::new(RuleSet::standard()?, completion, images);
//! let reply = router.route(&ChatRequest::new("hello"), None).await;
//! assert_eq!(reply, Reply::rule("Hello! How can I help you today?"));
//!
//! // Interactive sessions thread their context through each turn.
//! let (context, reply) = router.take_turn(context, "tell me a joke").await;
//! ```
//!
use super::context::{ChatMessage, ConversationContext};
use super::reply::{ChatRequest, Reply};
use super::rules::{RuleSet, BLANK_RESPONSE};
use crate::core::error::FurhiError;
use crate::services::completion::TextCompletion;
use crate::services::image::ImageGenerator;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Substring (matched case-insensitively) that routes a message to image generation.
pub const IMAGE_TRIGGER: &str = "generate image";
/// Substring marking a request to redo an earlier image with its original prompt.
pub const REGENERATE_TRIGGER: &str = "regenerate image";
/// Reply text when the image service produced nothing.
pub const IMAGE_FAILURE_TEXT: &str = "Failed to generate image.";

/// Routes messages among canned rules, the language model and the image service.
pub struct ChatRouter {
    rules: RuleSet,
    completion: Arc<dyn TextCompletion>,
    images: Arc<dyn ImageGenerator>,
}

impl ChatRouter {
    pub fn new(
        rules: RuleSet,
        completion: Arc<dyn TextCompletion>,
        images: Arc<dyn ImageGenerator>,
    ) -> Self {
        Self {
            rules,
            completion,
            images,
        }
    }

    pub fn images(&self) -> &dyn ImageGenerator {
        self.images.as_ref()
    }

    /// Answers a single message. `context`, when given, is sent to the
    /// language model ahead of the message; it is not modified.
    pub async fn route(&self, request: &ChatRequest, context: Option<&ConversationContext>) -> Reply {
        if let Some(response) = self.rules.match_message(request.message.as_deref()) {
            debug!("Message answered by rule");
            return Reply::rule(response);
        }
        let Some(message) = request.message.as_deref() else {
            debug!("Request carried no message");
            return Reply::rule(BLANK_RESPONSE);
        };

        if let Some(prompt) = image_prompt(request) {
            return self.image_reply(prompt).await;
        }

        self.text_reply(message, context).await
    }

    /// Processes one turn of an interactive conversation: routes `input`
    /// with `context`, then returns the context extended by the user turn and
    /// the reply text.
    pub async fn take_turn(
        &self,
        mut context: ConversationContext,
        input: &str,
    ) -> (ConversationContext, Reply) {
        let reply = self.route(&ChatRequest::new(input), Some(&context)).await;
        context.push_user(input);
        context.push_assistant(reply.display_text());
        (context, reply)
    }

    async fn image_reply(&self, prompt: String) -> Reply {
        info!("Routing to image generation with prompt '{}'", prompt);
        let result = self.images.generate(&prompt).await;
        if result.is_empty() {
            warn!("Image generation returned no images for '{}'", prompt);
            return Reply::text(IMAGE_FAILURE_TEXT);
        }
        Reply::multimodal(
            format!("Here's the image for: {}", result.prompt),
            result.images,
            result.prompt,
        )
    }

    async fn text_reply(&self, message: &str, context: Option<&ConversationContext>) -> Reply {
        let messages = match context {
            Some(context) => context.request_messages(message),
            None => vec![ChatMessage::user(message)],
        };
        debug!(
            "Routing to {} with {} message(s)",
            self.completion.name(),
            messages.len()
        );
        match self.completion.complete(&messages).await {
            Ok(text) => Reply::text(text),
            Err(e) => {
                warn!("{} call failed: {:#}", self.completion.name(), e);
                Reply::text(completion_failure_text(self.completion.name(), &e))
            }
        }
    }
}

/// Returns the generation prompt when `request` asks for an image.
pub fn image_prompt(request: &ChatRequest) -> Option<String> {
    let message = request.message.as_deref()?;
    // ASCII lowering keeps byte offsets aligned with the original message.
    let lowered = message.to_ascii_lowercase();
    if !lowered.contains(IMAGE_TRIGGER) {
        return None;
    }
    if lowered.contains(REGENERATE_TRIGGER) {
        return Some(request.prompt.clone().unwrap_or_default());
    }

    let mut stripped = String::with_capacity(message.len());
    let mut cursor = 0;
    for (start, _) in lowered.match_indices(IMAGE_TRIGGER) {
        stripped.push_str(&message[cursor..start]);
        cursor = start + IMAGE_TRIGGER.len();
    }
    stripped.push_str(&message[cursor..]);
    Some(stripped.trim().to_string())
}

/// User-facing text for a failed completion call.
fn completion_failure_text(service: &str, error: &anyhow::Error) -> String {
    match error.downcast_ref::<FurhiError>() {
        Some(FurhiError::UpstreamStatus { status, .. }) => {
            format!("Error: {} API returned {}", service, status)
        }
        Some(FurhiError::Transport { source, .. }) => {
            format!("Error calling {} API: {}", service, source)
        }
        _ => format!("Error calling {} API: {}", service, error),
    }
}
