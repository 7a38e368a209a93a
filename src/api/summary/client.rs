//! Gemini vision client with retry on transient failures

use super::gemini_config::GeminiConfig;
use super::models::*;
use crate::error::Result;
use crate::metrics::METRICS;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Mime type assumed when a reference does not carry one
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Vision model error types
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to fetch image: {0}")]
    ImageFetch(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream error: status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model returned no text")]
    EmptyResponse,
}

impl ModelError {
    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::Timeout(_) => true,
            Self::Upstream { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            _ => false,
        }
    }
}

/// A hosted model that can describe an image given an instruction
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send `prompt` and the image at `image_url` as one multimodal request
    async fn describe(&self, prompt: &str, image_url: &str) -> std::result::Result<String, ModelError>;
}

/// Where the image bytes for a request come from
#[derive(Debug, Clone, PartialEq)]
pub enum ImageReference {
    /// Payload already available as base64
    Inline(InlineData),
    /// Must be downloaded first
    Remote(String),
}

impl ImageReference {
    /// Classify an `imageUrl` value
    ///
    /// `data:` URLs keep their mime type, other `...base64,<payload>` strings
    /// and bare payloads are taken as JPEG, and http(s) URLs are fetched.
    pub fn parse(image_url: &str) -> Self {
        let trimmed = image_url.trim();

        if let Some(rest) = trimmed.strip_prefix("data:") {
            if let Some((meta, payload)) = rest.split_once(',') {
                let mime = meta
                    .split(';')
                    .next()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_IMAGE_MIME);
                return Self::Inline(InlineData {
                    mime_type: mime.to_string(),
                    data: payload.to_string(),
                });
            }
        }

        if let Some((_, payload)) = trimmed.split_once("base64,") {
            return Self::Inline(InlineData {
                mime_type: DEFAULT_IMAGE_MIME.to_string(),
                data: payload.to_string(),
            });
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Self::Remote(trimmed.to_string());
        }

        Self::Inline(InlineData {
            mime_type: DEFAULT_IMAGE_MIME.to_string(),
            data: trimmed.to_string(),
        })
    }
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Resolve an image reference into inline data
    async fn load_image(&self, image_url: &str) -> std::result::Result<InlineData, ModelError> {
        let url = match ImageReference::parse(image_url) {
            ImageReference::Inline(inline) => return Ok(inline),
            ImageReference::Remote(url) => url,
        };

        debug!("Fetching image: {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ModelError::ImageFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::ImageFetch(format!("{} returned status {}", url, status)));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ModelError::ImageFetch(e.to_string()))?;

        Ok(InlineData {
            mime_type,
            data: STANDARD.encode(&bytes),
        })
    }

    fn build_request(&self, prompt: &str, image: InlineData) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData { inline_data: image },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }

    /// Call the Gemini generateContent API once
    async fn call_generate_api(
        &self,
        request: &GenerateContentRequest,
    ) -> std::result::Result<String, ModelError> {
        let mut req = self.http.post(self.config.endpoint()).json(request);

        if let Some(api_key) = &self.config.api_key {
            req = req.header("x-goog-api-key", api_key.expose_secret().as_str());
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(e.to_string())
            } else {
                ModelError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ModelError::Upstream {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        body.first_text().ok_or(ModelError::EmptyResponse)
    }

    /// Calculate exponential backoff
    fn calculate_backoff(&self, attempt: usize) -> Duration {
        let base = self.config.retry_backoff();
        let multiplier = 2_u32.saturating_pow(attempt.saturating_sub(1) as u32);
        base.saturating_mul(multiplier)
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn describe(&self, prompt: &str, image_url: &str) -> std::result::Result<String, ModelError> {
        let image = self.load_image(image_url).await?;
        let request = self.build_request(prompt, image);

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.call_generate_api(&request).await {
                Ok(text) => {
                    METRICS.record_model_call("success");
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt <= self.config.max_retries => {
                    METRICS.record_model_call("retry");
                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "Model attempt {} failed: {}, retrying in {:?}",
                        attempt, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    METRICS.record_model_call("error");
                    error!("Model call failed after {} attempts: {}", attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
