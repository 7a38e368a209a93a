//! Data models for the summary API and the Gemini wire format

use serde::{Deserialize, Serialize};

/// Instruction sent alongside every whiteboard image
pub const WHITEBOARD_PROMPT: &str = "Can you summarize what's written on the whiteboard, \
start your sentence with 'The whiteboard shows a:' \
and make the response no bigger than 50 words.";

/// Body returned in place of a summary when the model call fails
pub const SUMMARY_UNAVAILABLE: &str = "Unable to generate summary";

/// Summary request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
}

impl SummaryRequest {
    /// The image reference, if present and non-empty
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Summary response (success and model failure share this shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

impl SummaryResponse {
    pub fn unavailable() -> Self {
        Self {
            summary: SUMMARY_UNAVAILABLE.to_string(),
        }
    }
}

/// Client error body for the summary API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryApiError {
    pub error: String,
}

impl SummaryApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Gemini content container used in requests
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Text or inline media content part
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 inline payload used for image requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Sampling parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// `generateContent` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

/// Top-level `generateContent` response envelope
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Candidate completion; `content` is absent when the answer was blocked
#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
