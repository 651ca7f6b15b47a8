//! LLM service abstraction
//!
//! Defines the `LlmService` capability used by the reply orchestrator:
//! a one-shot completion and a token-stream completion that reports
//! each generated chunk ("delta") through a callback.
//!
//! Implementations:
//! - `anthropic::AnthropicService` calls the Anthropic Messages API
//! - `mock::MockLlmService` returns scripted output for tests and local runs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod anthropic;
pub mod mock;
mod sse;

pub use anthropic::AnthropicService;
pub use mock::MockLlmService;

const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM configuration error: {0}")]
    Configuration(String),

    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("LLM response error: {0}")]
    Response(String),

    #[error("LLM rate limit exceeded")]
    RateLimit,

    #[error("LLM stream error: {0}")]
    Stream(String),
}

/// A prompt for the backend.
///
/// `system` and `input` are pre-rendered sections. The optional overrides are
/// only set when a caller supplied them; `None` lets the backend pick its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub input: String,
    pub agent: String,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Result of a one-shot completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub stop_reason: String,
}

/// LLM backend capability
#[async_trait::async_trait]
pub trait LlmService: Send + Sync {
    /// Produce the whole reply in a single call
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Produce the reply incrementally, invoking `on_delta` once per chunk in
    /// emission order.
    ///
    /// Returns once the backend signals the end of the stream. An error may be
    /// returned after some deltas were already delivered.
    async fn complete_stream(
        &self,
        request: CompletionRequest,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<(), LlmError>;

    /// Model used when a request does not name one
    fn default_model(&self) -> &str;
}

/// LLM service configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Backend provider (anthropic, mock)
    pub provider: String,
    pub api_key: String,
    pub default_model: String,
    pub max_tokens: u32,
    /// Override for the API base URL (proxies, local fakes)
    pub base_url: Option<String>,
}

impl LlmConfig {
    /// Create LLM config from environment variables
    pub fn from_env() -> Result<Self, LlmError> {
        dotenvy::dotenv().ok();

        let provider = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "mock".to_string());

        let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        if provider == "anthropic" && api_key.is_empty() {
            return Err(LlmError::Configuration(
                "ANTHROPIC_API_KEY is required when LLM_PROVIDER=anthropic".to_string(),
            ));
        }

        let default_model =
            std::env::var("LLM_DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let max_tokens = std::env::var("LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        Ok(Self {
            provider,
            api_key,
            default_model,
            max_tokens,
            base_url: std::env::var("LLM_BASE_URL").ok(),
        })
    }
}

/// LLM service factory
pub struct LlmServiceFactory;

impl LlmServiceFactory {
    /// Create the LLM service named by `config.provider`
    pub fn create(config: LlmConfig) -> Result<Arc<dyn LlmService>, LlmError> {
        match config.provider.as_str() {
            "anthropic" => {
                tracing::info!(model = %config.default_model, "Creating Anthropic LLM service");
                Ok(Arc::new(AnthropicService::new(config)))
            }
            "mock" => {
                tracing::info!("Creating mock LLM service");
                Ok(Arc::new(MockLlmService::new()))
            }
            other => Err(LlmError::Configuration(format!(
                "Unknown LLM provider: {}",
                other
            ))),
        }
    }
}
