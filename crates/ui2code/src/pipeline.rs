//! The four-stage orchestrator.
//!
//! Describe → refine description → generate markup → refine markup. Each
//! stage is one stateless request; everything carried forward is passed
//! explicitly as text in the next request.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::artifact::MarkupArtifact;
use crate::inference::{InferenceClient, InferenceRequest};
use crate::prompts;
use crate::types::{
    PipelineEvent, PipelineOutput, PipelineState, Stage, Ui2CodeError, Ui2CodeResult,
};
use crate::upload::PreparedImage;

/// Progress channel for a single run.
pub type EventSender = mpsc::UnboundedSender<PipelineEvent>;

/// Result of a successful run that was saved to disk.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub output: PipelineOutput,
    pub artifact: MarkupArtifact,
    pub path: PathBuf,
}

impl PipelineReport {
    pub fn success_message(&self) -> String {
        format!("HTML file '{}' has been created.", self.artifact.file_name())
    }

    /// The event announcing this report to the UI. `download` is the URL
    /// that serves this run's artifact, when there is one.
    pub fn completed_event(&self, download: Option<String>) -> PipelineEvent {
        PipelineEvent::Completed {
            file_name: self.artifact.file_name().to_string(),
            path: self.path.display().to_string(),
            message: self.success_message(),
            download,
        }
    }
}

/// Runs the chain against one inference backend.
#[derive(Clone)]
pub struct Pipeline {
    client: Arc<dyn InferenceClient>,
}

impl Pipeline {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Run all four stages in order.
    pub async fn run(
        &self,
        image: &PreparedImage,
        events: Option<&EventSender>,
    ) -> Ui2CodeResult<PipelineOutput> {
        let started = Instant::now();

        let description = self
            .single_turn(Stage::Describe, prompts::describe(image), events)
            .await?;
        let refined_description = self
            .single_turn(
                Stage::RefineDescription,
                prompts::refine_description(&description, image),
                events,
            )
            .await?;
        let markup = self
            .single_turn(
                Stage::GenerateMarkup,
                prompts::generate_markup(&refined_description),
                events,
            )
            .await?;
        let refined_markup = self
            .single_turn(
                Stage::RefineMarkup,
                prompts::refine_markup(&refined_description, &markup),
                events,
            )
            .await?;

        tracing::info!(
            state = ?PipelineState::Done,
            "Pipeline finished in {}ms",
            started.elapsed().as_millis()
        );

        Ok(PipelineOutput {
            description,
            refined_description,
            markup,
            refined_markup,
        })
    }

    /// Run the chain and write the refined markup to `path`.
    ///
    /// Nothing is written unless all four stages succeed.
    pub async fn run_and_save(
        &self,
        image: &PreparedImage,
        path: &Path,
        events: Option<&EventSender>,
    ) -> Ui2CodeResult<PipelineReport> {
        let output = self.run(image, events).await?;
        save(output, path)
    }

    /// One request against a fresh session, with progress events around it.
    #[tracing::instrument(skip_all, fields(stage = %stage))]
    async fn single_turn(
        &self,
        stage: Stage,
        request: InferenceRequest,
        events: Option<&EventSender>,
    ) -> Ui2CodeResult<String> {
        emit(
            events,
            PipelineEvent::StageStarted {
                stage,
                message: stage.status_message().to_string(),
            },
        );
        tracing::info!(state = ?stage.state(), "Stage started");
        let started = Instant::now();

        let text = self
            .client
            .generate(&request)
            .await
            .map_err(|source| Ui2CodeError::Stage { stage, source })?;

        if text.trim().is_empty() {
            return Err(Ui2CodeError::EmptyOutput(stage));
        }

        tracing::info!(
            chars = text.len(),
            "Stage completed in {}ms",
            started.elapsed().as_millis()
        );
        emit(
            events,
            PipelineEvent::StageCompleted {
                stage,
                text: text.clone(),
                markup: stage.produces_markup(),
            },
        );

        Ok(text)
    }
}

/// Write the refined markup of a finished run to `path`.
pub fn save(output: PipelineOutput, path: &Path) -> Ui2CodeResult<PipelineReport> {
    let artifact = MarkupArtifact::new(output.refined_markup.clone());
    artifact.write_to(path)?;

    Ok(PipelineReport {
        output,
        artifact,
        path: path.to_path_buf(),
    })
}

fn emit(events: Option<&EventSender>, event: PipelineEvent) {
    if let Some(tx) = events {
        // Receiver gone means nobody is watching; the run continues.
        let _ = tx.send(event);
    }
}
