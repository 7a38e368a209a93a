//! Whiteboard summary endpoint backed by a vision-capable language model
//!
//! - POST /api/summarize - Describe the whiteboard in an image

pub mod client;
pub mod gemini_config;
pub mod handlers;
pub mod models;

pub use client::{GeminiClient, ImageReference, ModelError, VisionModel};
pub use gemini_config::GeminiConfig;
pub use handlers::{summarize, SummaryError, SummaryState};
pub use models::{SummaryRequest, SummaryResponse, SUMMARY_UNAVAILABLE, WHITEBOARD_PROMPT};
