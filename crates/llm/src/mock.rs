//! Mock LLM Service Implementation
//!
//! Used by `LlmServiceFactory` when provider is `"mock"`, and by tests that
//! need deterministic output. Records every request for assertions.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::{CompletionRequest, CompletionResponse, LlmError, LlmService};

const MOCK_MODEL: &str = "mock-model";

#[derive(Debug, Clone)]
enum Script {
    /// Echo the last line of the prompt input
    Echo,
    /// Emit exactly these chunks
    Deltas(Vec<String>),
    /// Fail before producing anything
    Fail(String),
    /// Emit these chunks, then fail
    FailAfter(Vec<String>, String),
}

/// Mock LLM service for testing
#[derive(Debug, Clone)]
pub struct MockLlmService {
    script: Script,
    delta_delay: Option<Duration>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmService {
    /// Create a mock that echoes the prompt's last line
    pub fn new() -> Self {
        Self::with_script(Script::Echo)
    }

    /// Create a mock that produces exactly `deltas`
    pub fn with_deltas<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Deltas(deltas.into_iter().map(Into::into).collect()))
    }

    /// Create a mock whose every call fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    /// Create a mock that streams `deltas` and then fails with `message`
    pub fn failing_after<I, S>(deltas: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::FailAfter(
            deltas.into_iter().map(Into::into).collect(),
            message.into(),
        ))
    }

    /// Pause for `delay` before each streamed chunk
    pub fn with_delta_delay(mut self, delay: Duration) -> Self {
        self.delta_delay = Some(delay);
        self
    }

    /// Return all recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            delta_delay: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, request: &CompletionRequest) -> Result<(), LlmError> {
        self.requests
            .lock()
            .map_err(|e| LlmError::Request(format!("requests lock poisoned: {e}")))?
            .push(request.clone());
        Ok(())
    }

    fn echo_chunks(request: &CompletionRequest) -> Vec<String> {
        let last_line = request
            .input
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("empty");
        format!("Mock response to: {}", last_line)
            .split_inclusive(' ')
            .map(str::to_string)
            .collect()
    }
}

impl Default for MockLlmService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        tracing::info!(agent = %request.agent, "Mock LLM service processing completion request");
        self.record(&request)?;

        let chunks = match &self.script {
            Script::Echo => Self::echo_chunks(&request),
            Script::Deltas(deltas) => deltas.clone(),
            Script::Fail(message) | Script::FailAfter(_, message) => {
                return Err(LlmError::Response(message.clone()))
            }
        };

        let content: String = chunks.concat();
        let output_tokens = content.len() as i32 / 4;

        Ok(CompletionResponse {
            input_tokens: request.input.len() as i32 / 4,
            output_tokens,
            content,
            model: request.model.unwrap_or_else(|| MOCK_MODEL.to_string()),
            stop_reason: "end_turn".to_string(),
        })
    }

    async fn complete_stream(
        &self,
        request: CompletionRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<(), LlmError> {
        tracing::info!(agent = %request.agent, "Mock LLM service streaming completion");
        self.record(&request)?;

        let (chunks, failure) = match &self.script {
            Script::Echo => (Self::echo_chunks(&request), None),
            Script::Deltas(deltas) => (deltas.clone(), None),
            Script::Fail(message) => (Vec::new(), Some(message.clone())),
            Script::FailAfter(deltas, message) => (deltas.clone(), Some(message.clone())),
        };

        for chunk in &chunks {
            if let Some(delay) = self.delta_delay {
                tokio::time::sleep(delay).await;
            }
            on_delta(chunk.as_str());
        }

        match failure {
            Some(message) => Err(LlmError::Stream(message)),
            None => Ok(()),
        }
    }

    fn default_model(&self) -> &str {
        MOCK_MODEL
    }
}
