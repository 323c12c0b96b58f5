//! The final deliverable: one HTML file, written to disk and offered as a download.

use std::path::Path;

use crate::types::Ui2CodeResult;

/// File name used for both the written file and the download.
pub const ARTIFACT_FILE_NAME: &str = "index.html";

/// MIME type of the download.
pub const ARTIFACT_MIME: &str = "text/html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupArtifact {
    body: Vec<u8>,
}

impl MarkupArtifact {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            body: markup.into().into_bytes(),
        }
    }

    pub fn file_name(&self) -> &'static str {
        ARTIFACT_FILE_NAME
    }

    pub fn mime_type(&self) -> &'static str {
        ARTIFACT_MIME
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// `Content-Disposition` value for serving the download.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name())
    }

    /// Write the body bytes, creating parent directories as needed.
    pub fn write_to(&self, path: &Path) -> Ui2CodeResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.body)?;
        tracing::info!("Wrote {} bytes to {}", self.body.len(), path.display());
        Ok(())
    }
}
