//! Gemini `generateContent` client.
//!
//! Every call is a fresh single-turn exchange: one `user` content entry, the
//! stage's system instruction, and the shared generation and safety settings.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::inference::{
    GenerationConfig, InferenceClient, InferenceError, InferenceRequest, InferenceResult,
    ModelSettings, Part, SafetySetting,
};

/// Public Generative Language API endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// HTTP client for the hosted Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    settings: ModelSettings,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, settings: ModelSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            settings,
        }
    }

    /// Point the client at a different API host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.settings.model
        )
    }

    fn build_body<'a>(&'a self, request: &'a InferenceRequest) -> GenerateContentRequest<'a> {
        let b64 = base64::engine::general_purpose::STANDARD;
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart::Text { text },
                Part::Image { mime_type, data } => WirePart::InlineData {
                    inline_data: InlineData {
                        mime_type,
                        data: b64.encode(data),
                    },
                },
            })
            .collect();

        GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![WirePart::Text {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: &self.settings.generation,
            safety_settings: &self.settings.safety,
        }
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn generate(&self, request: &InferenceRequest) -> InferenceResult<String> {
        let body = self.build_body(request);
        tracing::debug!(
            model = %self.settings.model,
            parts = request.parts.len(),
            "Sending generateContent request"
        );

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| InferenceError::Decode(e.to_string()))?;
        parsed.into_text()
    }
}

// ── wire types ────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
    safety_settings: &'a [SafetySetting],
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentResponse {
    fn into_text(self) -> InferenceResult<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(InferenceError::Blocked(format!("prompt blocked: {reason}")));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(InferenceError::Empty)?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return match candidate.finish_reason.as_deref() {
                Some("SAFETY") => Err(InferenceError::Blocked(
                    "candidate blocked by safety filters".to_string(),
                )),
                _ => Err(InferenceError::Empty),
            };
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/v1beta/models/gemini-1.5-pro:generateContent";

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key", ModelSettings::default()).with_base_url(server.uri())
    }

    fn text_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        }))
    }

    #[tokio::test]
    async fn test_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "systemInstruction": { "parts": [{ "text": "be precise" }] },
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "look" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AQID" } }
                    ]
                }],
                "generationConfig": {
                    "topK": 64,
                    "maxOutputTokens": 8192,
                    "responseMimeType": "text/plain"
                },
                "safetySettings": [
                    { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_NONE" },
                    { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE" }
                ]
            })))
            .respond_with(text_response("A login form"))
            .expect(1)
            .mount(&server)
            .await;

        let request = InferenceRequest::new(
            "be precise",
            vec![
                Part::text("look"),
                Part::Image {
                    mime_type: "image/jpeg".to_string(),
                    data: vec![1, 2, 3],
                },
            ],
        );
        let text = client(&server).generate(&request).await.unwrap();
        assert_eq!(text, "A login form");
    }

    #[tokio::test]
    async fn test_joins_text_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "<html>" }, { "text": "</html>" }] }
                }]
            })))
            .mount(&server)
            .await;

        let request = InferenceRequest::new("sys", vec![Part::text("go")]);
        let text = client(&server).generate(&request).await.unwrap();
        assert_eq!(text, "<html></html>");
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let request = InferenceRequest::new("sys", vec![Part::text("go")]);
        let err = client(&server).generate(&request).await.unwrap_err();
        match err {
            InferenceError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_prompt_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "OTHER" }
            })))
            .mount(&server)
            .await;

        let request = InferenceRequest::new("sys", vec![Part::text("go")]);
        let err = client(&server).generate(&request).await.unwrap_err();
        assert!(matches!(err, InferenceError::Blocked(_)));
    }

    #[tokio::test]
    async fn test_safety_finish_without_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let request = InferenceRequest::new("sys", vec![Part::text("go")]);
        let err = client(&server).generate(&request).await.unwrap_err();
        assert!(matches!(err, InferenceError::Blocked(_)));
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let request = InferenceRequest::new("sys", vec![Part::text("go")]);
        let err = client(&server).generate(&request).await.unwrap_err();
        assert!(matches!(err, InferenceError::Empty));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let request = InferenceRequest::new("sys", vec![Part::text("go")]);
        let err = client(&server).generate(&request).await.unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)));
    }
}
