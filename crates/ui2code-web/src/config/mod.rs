//! Configuration loading and resolution.

use std::path::PathBuf;

use ui2code::inference::DEFAULT_MODEL;
use ui2code::{GeminiClient, ModelSettings};

/// Environment variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Default output file, relative to the working directory.
pub const DEFAULT_OUTPUT: &str = "index.html";

/// Upper bound accepted for `--max-upload-mb`.
pub const MAX_UPLOAD_MB_LIMIT: u32 = 4096;

/// Convert a megabyte upload limit to bytes, clamping instead of overflowing.
pub fn upload_limit_bytes(megabytes: u32) -> usize {
    usize::try_from(megabytes)
        .unwrap_or(usize::MAX)
        .saturating_mul(1024 * 1024)
}

/// Resolved settings for talking to the model and saving the result.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: Option<String>,
    pub output: PathBuf,
}

impl AppConfig {
    pub fn resolve(
        api_key: Option<&str>,
        model: Option<&str>,
        api_base: Option<&str>,
        output: Option<&str>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            api_key: resolve_api_key(api_key)?,
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            api_base: api_base.map(str::to_string),
            output: PathBuf::from(output.unwrap_or(DEFAULT_OUTPUT)),
        })
    }

    /// Build the hosted-model client these settings describe.
    pub fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key, ModelSettings::new(&self.model));
        match &self.api_base {
            Some(base) => client.with_base_url(base),
            None => client,
        }
    }
}

/// Resolve the API key: explicit flag first, then the environment.
pub fn resolve_api_key(explicit: Option<&str>) -> anyhow::Result<String> {
    if let Some(key) = explicit.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    for var in API_KEY_VARS {
        if let Ok(key) = std::env::var(var) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }
    }

    anyhow::bail!(
        "No API key configured. Pass --api-key or set {}",
        API_KEY_VARS.join(" or ")
    )
}
