//! Anthropic Claude API Implementation
//!
//! Calls the Anthropic Messages API (https://api.anthropic.com/v1/messages)
//! using reqwest HTTP client. Streaming uses the same endpoint with
//! `"stream": true` and decodes the server-sent event response.

use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::sse::{SseDecoder, StreamItem};
use crate::{CompletionRequest, CompletionResponse, LlmConfig, LlmError, LlmService};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "anthropic";

/// Anthropic Messages API request body
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<MessageBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    role: &'static str,
    content: String,
}

/// Anthropic Messages API response body
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: i32,
    output_tokens: i32,
}

/// Anthropic API error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Anthropic LLM service implementation
pub struct AnthropicService {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

impl AnthropicService {
    /// Create a new Anthropic service
    pub fn new(config: LlmConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            client: Client::new(),
            config,
            base_url,
        }
    }

    fn build_body(&self, request: CompletionRequest, stream: bool) -> MessagesRequest {
        if let Some(provider) = request.provider.as_deref() {
            if provider != PROVIDER {
                tracing::warn!(provider = %provider, "Provider override ignored by Anthropic backend");
            }
        }

        MessagesRequest {
            model: request
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| self.config.default_model.clone()),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            system: request.system,
            messages: vec![MessageBody {
                role: "user",
                content: request.input,
            }],
            temperature: request.temperature,
            stream,
        }
    }

    async fn send(&self, body: &MessagesRequest) -> Result<Response, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Request(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimit);
        }

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());

            if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_body) {
                return Err(LlmError::Response(format!(
                    "Anthropic API error ({}): {}",
                    error_response.error.error_type, error_response.error.message
                )));
            }

            return Err(LlmError::Response(format!(
                "Anthropic API returned {}: {}",
                status, error_body
            )));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmService for AnthropicService {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let agent = request.agent.clone();
        let body = self.build_body(request, false);

        tracing::debug!(model = %body.model, agent = %agent, max_tokens = body.max_tokens, "Sending Anthropic API request");

        let api_response: MessagesResponse = self
            .send(&body)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::Response(format!("Failed to parse response: {}", e)))?;

        // Extract text content from response blocks
        let content = api_response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<String>();

        Ok(CompletionResponse {
            content,
            model: api_response.model,
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
            stop_reason: api_response
                .stop_reason
                .unwrap_or_else(|| "end_turn".to_string()),
        })
    }

    async fn complete_stream(
        &self,
        request: CompletionRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<(), LlmError> {
        let agent = request.agent.clone();
        let body = self.build_body(request, true);

        tracing::debug!(model = %body.model, agent = %agent, "Opening Anthropic API stream");

        let mut chunks = self.send(&body).await?.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = chunks.next().await {
            let chunk =
                chunk.map_err(|e| LlmError::Stream(format!("Stream read failed: {}", e)))?;

            for item in decoder.push(&chunk) {
                match item {
                    StreamItem::Delta(text) => on_delta(text.as_str()),
                    StreamItem::Stop => return Ok(()),
                    StreamItem::Error(message) => return Err(LlmError::Stream(message)),
                }
            }
        }

        Err(LlmError::Stream(
            "Stream ended before message_stop".to_string(),
        ))
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }
}
