//! Core data types for the screenshot-to-markup chain.

use serde::{Deserialize, Serialize};

use crate::inference::InferenceError;

/// One step of the four-step chain, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Describe,
    RefineDescription,
    GenerateMarkup,
    RefineMarkup,
}

impl Stage {
    /// All stages in the order they run.
    pub const ALL: [Stage; 4] = [
        Stage::Describe,
        Stage::RefineDescription,
        Stage::GenerateMarkup,
        Stage::RefineMarkup,
    ];

    /// Stable identifier used in events and logs.
    pub fn id(self) -> &'static str {
        match self {
            Stage::Describe => "describe",
            Stage::RefineDescription => "refine_description",
            Stage::GenerateMarkup => "generate_markup",
            Stage::RefineMarkup => "refine_markup",
        }
    }

    /// Progress line shown while the stage is running.
    pub fn status_message(self) -> &'static str {
        match self {
            Stage::Describe => "🧑‍💻 Looking at your UI...",
            Stage::RefineDescription => "🔍 Refining description with visual comparison...",
            Stage::GenerateMarkup => "🛠️ Generating website...",
            Stage::RefineMarkup => "🔧 Refining website...",
        }
    }

    /// Whether the stage produces HTML (rendered as a code block) rather than prose.
    pub fn produces_markup(self) -> bool {
        matches!(self, Stage::GenerateMarkup | Stage::RefineMarkup)
    }

    /// The state the chain is in while this stage runs.
    pub fn state(self) -> PipelineState {
        match self {
            Stage::Describe => PipelineState::Describing,
            Stage::RefineDescription => PipelineState::RefiningDescription,
            Stage::GenerateMarkup => PipelineState::GeneratingMarkup,
            Stage::RefineMarkup => PipelineState::RefiningMarkup,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Linear state of one run, as recorded in logs. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    Describing,
    RefiningDescription,
    GeneratingMarkup,
    RefiningMarkup,
    Done,
    /// Failed while running the given stage, or before any stage started.
    Failed(Option<Stage>),
}

/// Text produced by each of the four stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub description: String,
    pub refined_description: String,
    pub markup: String,
    pub refined_markup: String,
}

impl PipelineOutput {
    /// Output of a single stage.
    pub fn get(&self, stage: Stage) -> &str {
        match stage {
            Stage::Describe => &self.description,
            Stage::RefineDescription => &self.refined_description,
            Stage::GenerateMarkup => &self.markup,
            Stage::RefineMarkup => &self.refined_markup,
        }
    }
}

/// Progress events emitted during a run. Serialized to JSON for SSE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A stage is about to call the model.
    StageStarted { stage: Stage, message: String },
    /// A stage returned its full text.
    StageCompleted {
        stage: Stage,
        text: String,
        markup: bool,
    },
    /// The artifact has been written and is ready to download.
    Completed {
        file_name: String,
        path: String,
        message: String,
        /// Where this run's artifact can be fetched, when served over HTTP.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download: Option<String>,
    },
    /// The run failed. Emitted once, by the outer boundary.
    Failed {
        stage: Option<Stage>,
        message: String,
    },
}

impl PipelineEvent {
    /// Event name used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::StageStarted { .. } => "stage_started",
            PipelineEvent::StageCompleted { .. } => "stage_completed",
            PipelineEvent::Completed { .. } => "completed",
            PipelineEvent::Failed { .. } => "failed",
        }
    }

    /// The failure event for an error caught at the outer boundary.
    pub fn failed(err: &Ui2CodeError) -> Self {
        PipelineEvent::Failed {
            stage: err.stage(),
            message: err.user_message(),
        }
    }
}

/// Errors that can occur while preparing an upload or running the chain.
#[derive(thiserror::Error, Debug)]
pub enum Ui2CodeError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported upload: {0}")]
    UnsupportedUpload(String),

    #[error("Stage {stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: InferenceError,
    },

    #[error("Stage {0} returned empty output")]
    EmptyOutput(Stage),
}

impl Ui2CodeError {
    /// The stage that failed, when the failure happened inside the chain.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Ui2CodeError::Stage { stage, .. } | Ui2CodeError::EmptyOutput(stage) => Some(*stage),
            _ => None,
        }
    }

    /// The single user-facing message for any failure.
    pub fn user_message(&self) -> String {
        format!("An error occurred: {self}")
    }
}

/// Convenience result type.
pub type Ui2CodeResult<T> = Result<T, Ui2CodeError>;
