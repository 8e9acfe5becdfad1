//! # Furhi Rule Matcher
//!
//! File: cli/src/bot/rules.rs
//!
//! ## Overview
//!
//! Canned replies for messages that never need a language model: greetings,
//! farewells, thanks, help requests, identity questions and blank input.
//! A `RuleSet` is an ordered table of `(pattern, response)` pairs; the first
//! pattern found anywhere in the trimmed message wins, so specific rules must
//! be declared before general ones.
//!
//! `RuleSet` holds no mutable state and is shared freely between requests.
//!
//! ## Examples
//!
//! ```rust
//! let rules = RuleSet::standard()?;
//! assert_eq!(rules.match_text("Hey!"), Some(GREETING_RESPONSE));
//! assert_eq!(rules.match_text("   "), Some(BLANK_RESPONSE));
//! assert_eq!(rules.match_text("What's the capital of France?"), None);
//! ```
//!
use crate::core::error::Result;
use anyhow::Context;
use regex::{Regex, RegexBuilder};

pub const GREETING_RESPONSE: &str = "Hello! How can I help you today?";
pub const FAREWELL_RESPONSE: &str = "Goodbye! Have a great day!";
pub const THANKS_RESPONSE: &str = "You're welcome! 😊";
pub const HELP_RESPONSE: &str = "I'm a personal assistant bot. I can answer general questions, \
help with small tasks, and guide you. Try asking me anything or say 'give me an example'.";
pub const IDENTITY_RESPONSE: &str =
    "I'm your personal assistant bot. You can call me Furhi Bot.";
pub const BLANK_RESPONSE: &str = "Please type something so I can help.";

/// The built-in table, in evaluation order. The blank-input rule stays last.
const STANDARD_RULES: &[(&str, &str)] = &[
    (
        r"\b(hi|hello|hey|yo|good morning|good afternoon|good evening)\b",
        GREETING_RESPONSE,
    ),
    (
        r"\b(bye|goodbye|see you|see ya|talk later|take care)\b",
        FAREWELL_RESPONSE,
    ),
    (r"\b(thanks|thank you|thx|much appreciated)\b", THANKS_RESPONSE),
    (
        r"\b(help|assist|support|what can you do|what are your capabilities)\b",
        HELP_RESPONSE,
    ),
    (
        r"\b(who (are|r) you|what is your name|your name)\b",
        IDENTITY_RESPONSE,
    ),
    (r"^\s*$", BLANK_RESPONSE),
];

/// A single pattern-to-canned-response mapping.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    response: String,
}

impl Rule {
    /// Compiles `pattern` case-insensitively.
    pub fn new(pattern: &str, response: impl Into<String>) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid rule pattern: {}", pattern))?;
        Ok(Self {
            pattern,
            response: response.into(),
        })
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Ordered rule table; first match wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Builds a table from `(pattern, response)` pairs, keeping their order.
    pub fn new<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let rules = entries
            .into_iter()
            .map(|(pattern, response)| Rule::new(pattern, response))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// The greeting / farewell / thanks / help / identity / blank table.
    pub fn standard() -> Result<Self> {
        Self::new(STANDARD_RULES.iter().copied())
    }

    /// Returns the response of the first rule matching `text`, or `None`
    /// when `text` is absent or nothing matches.
    pub fn match_message(&self, text: Option<&str>) -> Option<&str> {
        self.match_text(text?)
    }

    pub fn match_text(&self, text: &str) -> Option<&str> {
        let text = text.trim();
        self.rules
            .iter()
            .find(|rule| rule.is_match(text))
            .map(Rule::response)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
