//! Assistant reply generation
//!
//! Builds the prompt from a conversation's history, calls the LLM backend,
//! and persists the result. Replies for one conversation never overlap.
//!
//! Streaming replies run on a detached task: every chunk is broadcast to the
//! conversation's subscribers as it arrives, the concatenation is persisted
//! once the backend finishes, and the stored message is broadcast last. A
//! reply that fails, times out, or is cancelled is not persisted; subscribers
//! get an `error` event instead.

use std::sync::Arc;
use std::time::Duration;

use tessera_common::{Error, Result};
use tessera_llm::{CompletionRequest, LlmService};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::context::ContextBuilder;
use super::locks::KeyedLocks;
use crate::domain::entities::{Conversation, Message, MessageRole};
use crate::repository::ConversationStore;
use crate::streaming::{StreamEvent, StreamHub};

/// Agent used when neither the request nor the configuration names one
pub const FALLBACK_AGENT: &str = "general-assistant";

/// Introduces context text in the system section
pub const CONTEXT_PREAMBLE: &str = "Use the following background information when replying:";

/// Default bound on one streaming reply
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// Caller overrides for a single reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyOptions {
    pub agent: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub temperature: Option<f32>,
}

/// How a streaming reply ended
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// The reply was stored and announced
    Persisted(Message),
    /// The backend finished without producing text
    Empty,
    /// The backend or the store failed
    Failed(String),
    TimedOut,
    Cancelled,
}

/// Render history (and optional context) into a completion prompt.
///
/// System messages and context go to the system section; user and assistant
/// turns become `role: content` blocks separated by blank lines.
pub fn build_prompt(
    history: &[Message],
    context: Option<&str>,
    agent: String,
    options: &ReplyOptions,
) -> CompletionRequest {
    let mut system_parts = Vec::new();
    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        system_parts.push(format!("{}\n{}", CONTEXT_PREAMBLE, context));
    }

    let mut turns = Vec::new();
    for message in history {
        match message.role {
            MessageRole::System => system_parts.push(message.content.clone()),
            MessageRole::User | MessageRole::Assistant => {
                turns.push(format!("{}: {}", message.role, message.content));
            }
        }
    }

    CompletionRequest {
        system: if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        },
        input: turns.join("\n\n"),
        agent,
        model: options.model.clone().filter(|m| !m.is_empty()),
        provider: options.provider.clone().filter(|p| !p.is_empty()),
        temperature: options.temperature.filter(|t| *t > 0.0),
        max_tokens: None,
    }
}

/// Pick the agent: explicit request, then configured default, then the fallback
pub fn resolve_agent(requested: Option<&str>, default_agent: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .or_else(|| default_agent.map(str::trim).filter(|a| !a.is_empty()))
        .unwrap_or(FALLBACK_AGENT)
        .to_string()
}

pub struct ReplyOrchestrator {
    store: Arc<dyn ConversationStore>,
    llm: Option<Arc<dyn LlmService>>,
    hub: Option<Arc<StreamHub>>,
    context: ContextBuilder,
    default_agent: Option<String>,
    stream_timeout: Duration,
    locks: KeyedLocks,
    shutdown: CancellationToken,
}

impl ReplyOrchestrator {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            llm: None,
            hub: None,
            context: ContextBuilder::default(),
            default_agent: None,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            locks: KeyedLocks::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmService>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_hub(mut self, hub: Arc<StreamHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn with_default_agent(mut self, agent: Option<String>) -> Self {
        self.default_agent = agent;
        self
    }

    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Streaming tasks are cancelled when `token` is
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn can_stream(&self) -> bool {
        self.llm.is_some() && self.hub.is_some()
    }

    fn llm(&self) -> Result<&Arc<dyn LlmService>> {
        self.llm
            .as_ref()
            .ok_or_else(|| Error::Llm("No LLM backend configured".to_string()))
    }

    async fn prepare(
        &self,
        conversation: &Conversation,
        options: &ReplyOptions,
    ) -> Result<CompletionRequest> {
        let history = self.store.list_messages(conversation.id).await?;
        let context = self.context.build(conversation).await;
        let agent = resolve_agent(options.agent.as_deref(), self.default_agent.as_deref());

        Ok(build_prompt(&history, context.as_deref(), agent, options))
    }

    /// Generate, persist and return the whole reply in one call
    pub async fn generate_reply(
        &self,
        conversation: &Conversation,
        options: &ReplyOptions,
    ) -> Result<Message> {
        let llm = self.llm()?;
        let _guard = self.locks.acquire(conversation.id).await;

        let request = self.prepare(conversation, options).await?;
        tracing::debug!(conversation_id = %conversation.id, agent = %request.agent, "Generating reply");

        let response = llm
            .complete(request)
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(Error::Llm("LLM backend returned an empty reply".to_string()));
        }

        let message = Message::new(conversation.id, MessageRole::Assistant, response.content)?;
        let stored = self.store.create_message(&message).await?;

        tracing::info!(
            conversation_id = %conversation.id,
            message_id = %stored.id,
            model = %response.model,
            output_tokens = response.output_tokens,
            "Assistant reply stored"
        );
        Ok(stored)
    }

    /// Start a streaming reply on a detached task.
    ///
    /// The returned handle resolves once the reply has been persisted or
    /// abandoned; callers are free to drop it.
    pub fn stream_reply(
        self: &Arc<Self>,
        conversation: Conversation,
        options: ReplyOptions,
    ) -> Result<JoinHandle<StreamOutcome>> {
        if !self.can_stream() {
            return Err(Error::Internal(
                "Streaming replies need an LLM backend and a stream hub".to_string(),
            ));
        }

        let orchestrator = Arc::clone(self);
        let cancel = self.shutdown.child_token();

        Ok(tokio::spawn(async move {
            let conversation_id = conversation.id;
            let outcome = orchestrator
                .run_stream(conversation, options, cancel)
                .await;

            match &outcome {
                StreamOutcome::Persisted(message) => {
                    tracing::info!(conversation_id = %conversation_id, message_id = %message.id, "Streamed reply stored");
                }
                StreamOutcome::Empty => {
                    tracing::debug!(conversation_id = %conversation_id, "Streamed reply was empty, nothing stored");
                }
                StreamOutcome::Failed(reason) => {
                    tracing::error!(conversation_id = %conversation_id, error = %reason, "Streamed reply failed");
                }
                StreamOutcome::TimedOut => {
                    tracing::warn!(conversation_id = %conversation_id, "Streamed reply timed out");
                }
                StreamOutcome::Cancelled => {
                    tracing::info!(conversation_id = %conversation_id, "Streamed reply cancelled");
                }
            }
            outcome
        }))
    }

    async fn run_stream(
        &self,
        conversation: Conversation,
        options: ReplyOptions,
        cancel: CancellationToken,
    ) -> StreamOutcome {
        let conversation_id = conversation.id;
        let (Some(llm), Some(hub)) = (self.llm.as_ref(), self.hub.as_ref()) else {
            return StreamOutcome::Failed("Streaming is not configured".to_string());
        };

        let _guard = tokio::select! {
            guard = self.locks.acquire(conversation_id) => guard,
            _ = cancel.cancelled() => return self.abandon(hub, conversation_id, StreamOutcome::Cancelled),
        };

        let request = match self.prepare(&conversation, &options).await {
            Ok(request) => request,
            Err(e) => {
                return self.abandon(hub, conversation_id, StreamOutcome::Failed(e.to_string()))
            }
        };

        let mut accumulated = String::new();
        let mut on_delta = |delta: &str| {
            accumulated.push_str(delta);
            hub.broadcast(conversation_id, &StreamEvent::delta(conversation_id, delta));
        };

        let finished = tokio::select! {
            result = tokio::time::timeout(self.stream_timeout, llm.complete_stream(request, &mut on_delta)) => {
                match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(StreamOutcome::Failed(e.to_string())),
                    Err(_) => Some(StreamOutcome::TimedOut),
                }
            }
            _ = cancel.cancelled() => Some(StreamOutcome::Cancelled),
        };
        if let Some(outcome) = finished {
            return self.abandon(hub, conversation_id, outcome);
        }

        if accumulated.trim().is_empty() {
            return StreamOutcome::Empty;
        }

        let stored = match Message::new(conversation_id, MessageRole::Assistant, accumulated) {
            Ok(message) => self.store.create_message(&message).await,
            Err(e) => Err(e),
        };
        match stored {
            Ok(message) => {
                hub.broadcast(conversation_id, &StreamEvent::from(&message));
                StreamOutcome::Persisted(message)
            }
            Err(e) => self.abandon(hub, conversation_id, StreamOutcome::Failed(e.to_string())),
        }
    }

    fn abandon(&self, hub: &StreamHub, conversation_id: Uuid, outcome: StreamOutcome) -> StreamOutcome {
        let message = match &outcome {
            StreamOutcome::TimedOut => "Reply timed out".to_string(),
            StreamOutcome::Cancelled => "Reply cancelled".to_string(),
            StreamOutcome::Failed(reason) => format!("Reply failed: {}", reason),
            StreamOutcome::Persisted(_) | StreamOutcome::Empty => return outcome,
        };
        hub.broadcast(conversation_id, &StreamEvent::error(conversation_id, message));
        outcome
    }
}
