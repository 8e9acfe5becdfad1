//! # Furhi Text Completion Service
//!
//! File: cli/src/services/completion.rs
//!
//! ## Overview
//!
//! Wraps the hosted language model. The router only sees the
//! `TextCompletion` trait; `GroqClient` is the production implementation that
//! talks to an OpenAI-compatible `chat/completions` endpoint.
//!
//! ## Wire Format
//!
//! ```json
//! POST <api_url>
//! Authorization: Bearer <GROQ_API_KEY>
//! {"model": "llama-3.3-70b-versatile", "messages": [{"role": "user", "content": "..."}]}
//!
//! 200 OK
//! {"choices": [{"message": {"role": "assistant", "content": "..."}}]}
//! ```
//!
//! Any other status is reported as `FurhiError::UpstreamStatus`. Each call is
//! attempted exactly once.
//!
use crate::bot::context::ChatMessage;
use crate::core::config::{CompletionConfig, GROQ_API_KEY_VAR};
use crate::core::error::{FurhiError, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A hosted language model that turns a message list into reply text.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Display name used in user-facing error text (e.g. "Groq").
    fn name(&self) -> &'static str;

    /// Generates the assistant reply for `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

const SERVICE: &str = "Groq";

/// Groq `chat/completions` client.
pub struct GroqClient {
    api_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: Option<u32>,
    http: HttpClient,
}

impl GroqClient {
    /// A missing `api_key` is not fatal here; each call then fails with
    /// `FurhiError::MissingCredential`.
    pub fn new(config: &CompletionConfig, api_key: Option<String>) -> Self {
        Self {
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
            max_tokens: None,
            http: HttpClient::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl TextCompletion for GroqClient {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or(FurhiError::MissingCredential {
            var: GROQ_API_KEY_VAR,
        })?;

        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
        };
        debug!(
            "Sending {} message(s) to {} model {}",
            messages.len(),
            SERVICE,
            self.model
        );

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| FurhiError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{} returned {}: {}", SERVICE, status, body);
            return Err(FurhiError::UpstreamStatus {
                service: SERVICE,
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let payload: CompletionResponse =
            response.json().await.map_err(|e| FurhiError::UnexpectedResponse {
                service: SERVICE,
                detail: e.to_string(),
            })?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                FurhiError::UnexpectedResponse {
                    service: SERVICE,
                    detail: "no choices in completion response".to_string(),
                }
                .into()
            })
    }
}

// --- Unit Tests ---

/// Exercises `GroqClient` against small local axum servers standing in for the API.
#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// Serves `app` on an ephemeral localhost port and returns its URL.
    async fn spawn_stub(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    fn client(url: String, key: Option<&str>) -> GroqClient {
        let config = CompletionConfig {
            api_url: url,
            model: "test-model".into(),
        };
        GroqClient::new(&config, key.map(String::from))
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let seen: Arc<Mutex<Option<(Option<String>, Value)>>> = Arc::default();
        let captured = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: axum::http::HeaderMap, Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    *captured.lock().unwrap() = Some((auth, body));
                    Json(json!({"choices": [{"message": {"role": "assistant", "content": "Paris."}}]}))
                }
            }),
        );
        let url = spawn_stub(app).await;

        let reply = client(url, Some("gsk_test"))
            .with_max_tokens(200)
            .complete(&[ChatMessage::user("Capital of France?")])
            .await
            .unwrap();
        assert_eq!(reply, "Paris.");

        let (auth, body) = seen.lock().unwrap().take().expect("request captured");
        assert_eq!(auth.as_deref(), Some("Bearer gsk_test"));
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(
            body["messages"],
            json!([{"role": "user", "content": "Capital of France?"}])
        );
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let url = spawn_stub(app).await;

        let err = client(url, Some("k"))
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        match err.downcast_ref::<FurhiError>() {
            Some(FurhiError::UpstreamStatus { status, body, .. }) => {
                assert_eq!(*status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_unexpected_response() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let url = spawn_stub(app).await;

        let err = client(url, Some("k"))
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FurhiError>(),
            Some(FurhiError::UnexpectedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_upstream() {
        let err = client("http://127.0.0.1:9/unused".into(), None)
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains(GROQ_API_KEY_VAR));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}/v1/chat/completions", addr), Some("k"))
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FurhiError>(),
            Some(FurhiError::Transport { .. })
        ));
    }
}
