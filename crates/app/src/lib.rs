//! Tessera application composition root
//!
//! Wires configuration, storage, the LLM backend and the stream hub into the
//! conversations router.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::PgPool;
use tessera_auth::{AuthBackend, AuthConfig};
use tessera_common::Config;
use tessera_conversations::{
    ContextBuilder, ConversationService, ConversationStore, ConversationsRepositories,
    ConversationsState, InMemoryConversationStore, ReplyOrchestrator, StreamHub,
};
use tessera_llm::{LlmConfig, LlmService, LlmServiceFactory};
use tokio_util::sync::CancellationToken;

/// Open the configured store: PostgreSQL when `DATABASE_URL` is set, memory otherwise
pub async fn connect_store(config: &Config) -> Result<Arc<dyn ConversationStore>, anyhow::Error> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .map_err(|e| anyhow::anyhow!("Database connection failed: {}", e))?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            tracing::info!("Database connection established, migrations applied");
            Ok(Arc::new(ConversationsRepositories::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, conversations are kept in memory");
            Ok(Arc::new(InMemoryConversationStore::new()))
        }
    }
}

/// Build the router from already-constructed collaborators.
///
/// Streaming replies are cancelled when `shutdown` fires.
pub fn build_app(
    config: &Config,
    store: Arc<dyn ConversationStore>,
    llm: Arc<dyn LlmService>,
    hub: Arc<StreamHub>,
    shutdown: CancellationToken,
) -> Router {
    let replies = ReplyOrchestrator::new(Arc::clone(&store))
        .with_llm(llm)
        .with_hub(Arc::clone(&hub))
        .with_context(ContextBuilder::new())
        .with_default_agent(config.default_agent.clone())
        .with_stream_timeout(Duration::from_secs(config.stream_timeout_secs))
        .with_shutdown(shutdown);

    let service = ConversationService::new(store, Some(Arc::clone(&hub)), Arc::new(replies))
        .with_streaming(config.streaming_enabled);

    let conversations_state = ConversationsState {
        service: Arc::new(service),
        hub,
        auth: AuthBackend::new(AuthConfig::from(config)),
        subscriber_capacity: config.subscriber_queue_capacity,
    };

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route(
            "/",
            axum::routing::get(|| async { "Tessera API v0.0.1-SNAPSHOT" }),
        )
        .merge(tessera_conversations::routes().with_state(conversations_state))
}

/// Create the main application router with all routes and middleware
pub async fn create_app(
    config: &Config,
    shutdown: CancellationToken,
) -> Result<Router, anyhow::Error> {
    let store = connect_store(config).await?;
    let llm = LlmServiceFactory::create(LlmConfig::from_env()?)?;

    let hub = Arc::new(StreamHub::new());

    Ok(build_app(config, store, llm, hub, shutdown))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
