//! Configuration for the Gemini vision model client

use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

/// Gemini client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// Generative Language API base URL (without the `/models/...` suffix)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Vision-capable model name
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (read from env GOOGLE_API_KEY if not set)
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Output length cap; unset leaves it to the model
    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    /// Request timeout in milliseconds; unset means no timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Extra attempts after a transient failure
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Base backoff in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_api_base() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_model() -> String { "gemini-1.5-flash".to_string() }
fn default_max_retries() -> usize { 2 }
fn default_retry_backoff_ms() -> u64 { 200 }

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: None,
            temperature: 0.0,
            max_output_tokens: None,
            timeout_ms: None,
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl GeminiConfig {
    /// Load configuration from environment variables
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("GEMINI_API_BASE") {
            self.api_base = val;
        }

        if let Ok(val) = std::env::var("GEMINI_MODEL") {
            self.model = val;
        }

        if let Ok(val) = std::env::var("GOOGLE_API_KEY") {
            if !val.is_empty() {
                self.api_key = Some(SecretString::new(val));
            }
        }

        if let Ok(val) = std::env::var("MODEL_TEMPERATURE") {
            if let Ok(temperature) = val.parse() {
                self.temperature = temperature;
            }
        }

        if let Ok(val) = std::env::var("MODEL_MAX_OUTPUT_TOKENS") {
            if let Ok(max) = val.parse() {
                self.max_output_tokens = Some(max);
            }
        }

        if let Ok(val) = std::env::var("MODEL_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.timeout_ms = Some(timeout);
            }
        }

        if let Ok(val) = std::env::var("MODEL_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.max_retries = retries;
            }
        }

        if let Ok(val) = std::env::var("MODEL_RETRY_BACKOFF_MS") {
            if let Ok(ms) = val.parse() {
                self.retry_backoff_ms = ms;
            }
        }

        self
    }

    /// Full `generateContent` endpoint for the configured model
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }

    /// Get timeout as Duration, if one is configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Get retry backoff as Duration
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
