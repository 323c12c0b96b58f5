//! One-shot terminal run: same unit of work as the web job, printed to stdout.

use std::path::Path;

use tokio::sync::mpsc;
use ui2code::{Pipeline, PipelineEvent, PipelineReport, PreparedImage, Ui2CodeResult};

/// Terminal rendering of a progress event.
pub fn render_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::StageStarted { message, .. } => format!("\n{message}\n"),
        PipelineEvent::StageCompleted { text, markup, .. } => {
            if *markup {
                format!("```html\n{}\n```", text.trim_end())
            } else {
                text.trim_end().to_string()
            }
        }
        PipelineEvent::Completed { message, path, .. } => format!("\n✅ {message} ({path})"),
        PipelineEvent::Failed { message, .. } => format!("\n❌ {message}"),
    }
}

/// Normalize the image at `image_path`, run the chain and save to `output`.
///
/// Progress is printed as it happens. Returns `false` after printing the one
/// error message if anything failed.
pub async fn run(pipeline: &Pipeline, image_path: &Path, output: &Path) -> bool {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", render_event(&event));
        }
    });

    let result: Ui2CodeResult<PipelineReport> = async {
        let data = tokio::fs::read(image_path).await?;
        let file_name = image_path.file_name().and_then(|n| n.to_str());
        let image = PreparedImage::from_upload(&data, file_name)?;
        pipeline.run_and_save(&image, output, Some(&tx)).await
    }
    .await;

    let ok = match result {
        Ok(report) => {
            let _ = tx.send(report.completed_event(None));
            true
        }
        Err(e) => {
            tracing::debug!("Run failed: {e:?}");
            let _ = tx.send(PipelineEvent::failed(&e));
            false
        }
    };

    drop(tx);
    if let Err(e) = printer.await {
        tracing::warn!("Progress printer stopped: {e}");
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use ui2code::mock::ScriptedClient;
    use ui2code::Stage;

    #[test]
    fn test_markup_rendered_as_code_block() {
        let event = PipelineEvent::StageCompleted {
            stage: Stage::GenerateMarkup,
            text: "<html>A</html>\n".to_string(),
            markup: true,
        };
        assert_eq!(render_event(&event), "```html\n<html>A</html>\n```");
    }

    #[tokio::test]
    async fn test_missing_image_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("index.html");
        let client = Arc::new(ScriptedClient::with_texts(["a", "b", "c", "d"]));

        let ok = run(
            &Pipeline::new(client.clone()),
            &dir.path().join("missing.png"),
            &output,
        )
        .await;

        assert!(!ok);
        assert!(!output.exists());
        assert_eq!(client.call_count(), 0);
    }
}
