//! The inference service contract: one stateless, single-turn request with a
//! fixed system instruction and generation configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default hosted model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// One piece of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(t) => Some(t),
            Part::Image { .. } => None,
        }
    }
}

/// A single-turn request against a fresh session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
    pub system_instruction: String,
    pub parts: Vec<Part>,
}

impl InferenceRequest {
    pub fn new(system_instruction: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            parts,
        }
    }

    /// All text parts joined with newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_image(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::Image { .. }))
    }
}

/// Sampling parameters, identical for every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// A content-safety category and the threshold applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    /// No category blocked: harassment, hate speech, sexual and dangerous content.
    pub fn permissive() -> Vec<SafetySetting> {
        [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|category| SafetySetting {
            category: category.to_string(),
            threshold: "BLOCK_NONE".to_string(),
        })
        .collect()
    }
}

/// Model identity plus the fixed per-call configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub generation: GenerationConfig,
    pub safety: Vec<SafetySetting>,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            generation: GenerationConfig::default(),
            safety: SafetySetting::permissive(),
        }
    }
}

/// Errors returned by an inference backend.
#[derive(thiserror::Error, Debug)]
pub enum InferenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Response contained no text")]
    Empty,

    #[error("Malformed response: {0}")]
    Decode(String),
}

pub type InferenceResult<T> = Result<T, InferenceError>;

/// A hosted multimodal model that answers one request with text.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, request: &InferenceRequest) -> InferenceResult<String>;
}
