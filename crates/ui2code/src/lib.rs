//! ui2code: turn a UI screenshot into a single styled HTML file through a
//! four-stage multimodal model chain.

pub mod artifact;
pub mod gemini;
pub mod inference;
pub mod mock;
pub mod pipeline;
pub mod prompts;
pub mod types;
pub mod upload;

pub use artifact::MarkupArtifact;
pub use gemini::GeminiClient;
pub use inference::{
    GenerationConfig, InferenceClient, InferenceError, InferenceRequest, InferenceResult,
    ModelSettings, Part, SafetySetting,
};
pub use pipeline::{save, EventSender, Pipeline, PipelineReport};
pub use types::*;
pub use upload::{is_supported_upload, PreparedImage};
