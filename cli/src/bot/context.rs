//! # Furhi Conversation Model
//!
//! File: cli/src/bot/context.rs
//!
//! Chat turns and the ordered context handed to the language model. A
//! `ConversationContext` always starts with exactly one system message and
//! only grows by appending; it is owned by whoever drives the conversation and
//! passed explicitly into each turn.
//!
use serde::{Deserialize, Serialize};

/// Speaker of a chat turn, serialized the way OpenAI-compatible APIs expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered turn history: one system message followed by user/assistant turns.
///
/// Growth is unbounded; nothing is ever truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationContext {
    messages: Vec<ChatMessage>,
}

impl ConversationContext {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    /// Seeds a context with previously persisted turns. System messages in
    /// `history` are dropped so the opening system message stays unique.
    pub fn with_history<I>(system_prompt: impl Into<String>, history: I) -> Self
    where
        I: IntoIterator<Item = ChatMessage>,
    {
        let mut context = Self::new(system_prompt);
        context.messages.extend(
            history
                .into_iter()
                .filter(|message| message.role != Role::System),
        );
        context
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Drops every turn, keeping the system message.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of user/assistant turns after the system message.
    pub fn turn_count(&self) -> usize {
        self.messages.len() - 1
    }

    /// Messages to send upstream for a new `user_message`: the context
    /// followed by the new user turn.
    pub fn request_messages(&self, user_message: &str) -> Vec<ChatMessage> {
        let mut messages = self.messages.clone();
        messages.push(ChatMessage::user(user_message));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_single_system_message() {
        let context = ConversationContext::new("be nice");
        assert_eq!(context.messages(), &[ChatMessage::system("be nice")]);
        assert_eq!(context.turn_count(), 0);
    }

    #[test]
    fn history_is_appended_after_system_message() {
        let context = ConversationContext::with_history(
            "sys",
            vec![
                ChatMessage::system("stray"),
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
            ],
        );
        assert_eq!(
            context.messages(),
            &[
                ChatMessage::system("sys"),
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
            ]
        );
    }

    #[test]
    fn request_messages_do_not_mutate_context() {
        let mut context = ConversationContext::new("sys");
        context.push_user("first");
        context.push_assistant("reply");

        let request = context.request_messages("second");
        assert_eq!(request.len(), 4);
        assert_eq!(request.last(), Some(&ChatMessage::user("second")));
        assert_eq!(context.turn_count(), 2);
    }

    #[test]
    fn reset_keeps_system_message() {
        let mut context = ConversationContext::new("sys");
        context.push_user("a");
        context.push_assistant("b");
        context.reset();
        assert_eq!(context.messages(), &[ChatMessage::system("sys")]);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "ok"}));
    }
}
