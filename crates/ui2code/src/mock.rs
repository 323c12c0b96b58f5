//! Scripted inference client for tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::inference::{InferenceClient, InferenceError, InferenceRequest, InferenceResult};

enum Reply {
    Text(String),
    Fail(String),
}

/// Replays canned replies in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client answering successive calls with the given texts.
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for text in texts {
            client.push_text(text);
        }
        client
    }

    pub fn push_text(&self, text: impl Into<String>) -> &Self {
        self.lock_replies().push_back(Reply::Text(text.into()));
        self
    }

    /// Queue a service-side failure for the next unanswered call.
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.lock_replies().push_back(Reply::Fail(message.into()));
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Reply>> {
        self.replies.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn generate(&self, request: &InferenceRequest) -> InferenceResult<String> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request.clone());

        match self.lock_replies().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(InferenceError::Api {
                status: 500,
                message,
            }),
            None => Err(InferenceError::Empty),
        }
    }
}
