//! # Furhi Image Service
//!
//! File: cli/src/services/image.rs
//!
//! ## Overview
//!
//! Generates images for "generate image ..." messages. The router depends on
//! the `ImageGenerator` trait; `ReplicateClient` is the production
//! implementation backed by the Replicate predictions API.
//!
//! Generation never fails loudly: every error is logged and an empty image
//! list is returned, which callers treat as "failed to generate".
//!
//! ## Architecture
//!
//! 1. `POST {api_base}/models/{owner}/{name}/predictions` with `Prefer: wait`
//!    and input `{prompt, width, height}`.
//! 2. If the prediction is still `starting`/`processing`, poll `urls.get`
//!    until it settles or the poll timeout elapses.
//! 3. Collect output URLs, download each one (a failed download is skipped)
//!    and encode the bytes as `data:<mime>;base64,<payload>`.
//!
use crate::core::config::{ImageConfig, REPLICATE_API_TOKEN_VAR};
use crate::core::error::{FurhiError, Result};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const SERVICE: &str = "Replicate";
const DEFAULT_MIME: &str = "image/png";

/// A generation prompt and the encoded images it produced.
///
/// An empty `images` list means generation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageResult {
    pub prompt: String,
    pub images: Vec<String>,
}

impl ImageResult {
    pub fn empty(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// A hosted text-to-image model.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates images for `prompt`. Failures yield an empty result.
    async fn generate(&self, prompt: &str) -> ImageResult;
}

/// Encodes raw image bytes as a data URI.
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Splits a `data:<mime>;base64,<payload>` URI into its MIME type and bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("Not a data URI"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("Data URI has no payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("Data URI is not base64 encoded"))?;
    let bytes = BASE64
        .decode(payload.trim())
        .context("Data URI payload is not valid base64")?;
    Ok((mime.to_string(), bytes))
}

/// File extension matching an image MIME type.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

/// Replicate predictions client.
pub struct ReplicateClient {
    api_base: String,
    model: String,
    width: u32,
    height: u32,
    poll_interval: Duration,
    poll_timeout: Duration,
    api_token: Option<String>,
    http: HttpClient,
}

impl ReplicateClient {
    pub fn new(config: &ImageConfig, api_token: Option<String>) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.trim().to_string(),
            width: config.width,
            height: config.height,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
            api_token,
            http: HttpClient::new(),
        }
    }

    fn predictions_endpoint(&self) -> String {
        format!("{}/models/{}/predictions", self.api_base, self.model)
    }

    /// Runs one prediction to completion and returns its output URLs.
    async fn run_prediction(&self, prompt: &str) -> Result<Vec<String>> {
        let api_token = self
            .api_token
            .as_deref()
            .ok_or(FurhiError::MissingCredential {
                var: REPLICATE_API_TOKEN_VAR,
            })?;

        let endpoint = self.predictions_endpoint();
        let payload = json!({
            "input": {
                "prompt": prompt,
                "width": self.width,
                "height": self.height,
            }
        });
        info!("Requesting image from {} ({})", SERVICE, self.model);

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_token)
            .header("Prefer", "wait")
            .json(&payload)
            .send()
            .await
            .map_err(|source| FurhiError::Transport {
                service: SERVICE,
                source,
            })?;
        let mut prediction = json_or_status_error(response).await?;

        let status = prediction_status(&prediction);
        if status != "succeeded" {
            if matches!(status.as_str(), "starting" | "processing") {
                let poll_url = prediction
                    .get("urls")
                    .and_then(|urls| urls.get("get"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| FurhiError::UnexpectedResponse {
                        service: SERVICE,
                        detail: "prediction missing poll URL".to_string(),
                    })?
                    .to_string();
                prediction = self.poll_prediction(&poll_url, api_token).await?;
            } else {
                bail!(FurhiError::ImageGeneration(format!(
                    "prediction ended with status '{}': {}",
                    status,
                    prediction.get("error").unwrap_or(&Value::Null)
                )));
            }
        }

        let mut urls = Vec::new();
        if let Some(output) = prediction.get("output") {
            extract_output_urls(output, &mut urls);
        }
        debug!("Prediction produced {} output URL(s)", urls.len());
        Ok(urls)
    }

    async fn poll_prediction(&self, poll_url: &str, api_token: &str) -> Result<Value> {
        let started = Instant::now();
        loop {
            let response = self
                .http
                .get(poll_url)
                .bearer_auth(api_token)
                .send()
                .await
                .map_err(|source| FurhiError::Transport {
                    service: SERVICE,
                    source,
                })?;
            let prediction = json_or_status_error(response).await?;
            let status = prediction_status(&prediction);
            debug!("Prediction status: {}", status);
            if status == "succeeded" {
                return Ok(prediction);
            }
            if matches!(status.as_str(), "failed" | "canceled") {
                bail!(FurhiError::ImageGeneration(format!(
                    "prediction {}: {}",
                    status,
                    prediction.get("error").unwrap_or(&Value::Null)
                )));
            }
            if started.elapsed() >= self.poll_timeout {
                bail!(FurhiError::ImageGeneration(format!(
                    "polling timed out after {}s",
                    self.poll_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Downloads one output image and encodes it as a data URI.
    async fn download_as_data_uri(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed downloading image ({})", url))?;
        if !response.status().is_success() {
            bail!("Image download returned {} ({})", response.status(), url);
        }
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or("").trim().to_string())
            .filter(|value| value.starts_with("image/"))
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed reading image bytes ({})", url))?;
        Ok(encode_data_uri(&mime, &bytes))
    }
}

#[async_trait]
impl ImageGenerator for ReplicateClient {
    async fn generate(&self, prompt: &str) -> ImageResult {
        let urls = match self.run_prediction(prompt).await {
            Ok(urls) => urls,
            Err(e) => {
                error!("{} error: {:#}", SERVICE, e);
                return ImageResult::empty(prompt);
            }
        };

        let mut images = Vec::with_capacity(urls.len());
        for url in urls {
            match self.download_as_data_uri(&url).await {
                Ok(data_uri) => images.push(data_uri),
                Err(e) => warn!("Error downloading image: {:#}", e),
            }
        }
        info!("Generated {} image(s) for prompt '{}'", images.len(), prompt);
        ImageResult {
            prompt: prompt.to_string(),
            images,
        }
    }
}

async fn json_or_status_error(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FurhiError::UpstreamStatus {
            service: SERVICE,
            status: status.as_u16(),
            body,
        }
        .into());
    }
    response.json::<Value>().await.map_err(|e| {
        FurhiError::UnexpectedResponse {
            service: SERVICE,
            detail: e.to_string(),
        }
        .into()
    })
}

fn prediction_status(prediction: &Value) -> String {
    prediction
        .get("status")
        .and_then(Value::as_str)
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Collects http(s) URLs from a string, array, or `{url|urls|output}` object, without duplicates.
fn extract_output_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => {
            let trimmed = url.trim();
            if trimmed.starts_with("http") && !out.iter().any(|existing| existing == trimmed) {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(rows) => {
            for row in rows {
                extract_output_urls(row, out);
            }
        }
        Value::Object(obj) => {
            for key in ["url", "urls", "output"] {
                if let Some(inner) = obj.get(key) {
                    extract_output_urls(inner, out);
                }
            }
        }
        _ => {}
    }
}
