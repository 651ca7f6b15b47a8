//! Common test utilities for integration tests
//!
//! - `TestApp`: the application router over an in-memory store and a mock LLM
//! - JWT minting for authenticated requests
//! - Request and response helpers

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    http::{Method, Request, Response},
    Router,
};
use serde_json::Value;
use tessera_common::Config;
use tessera_conversations::{InMemoryConversationStore, StreamHub};
use tessera_llm::MockLlmService;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_only"; // pragma: allowlist secret

/// Configuration used by every test app
pub fn test_config(streaming_enabled: bool) -> Config {
    Config {
        database_url: None,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_issuer: None,
        jwt_audience: None,
        streaming_enabled,
        stream_timeout_secs: 5,
        subscriber_queue_capacity: 16,
        default_agent: None,
        log_format: "pretty".to_string(),
        port: 0,
    }
}

/// Application under test
pub struct TestApp {
    pub config: Config,
    pub llm: Arc<MockLlmService>,
    pub store: Arc<InMemoryConversationStore>,
    pub hub: Arc<StreamHub>,
    pub shutdown: CancellationToken,
    router: Router,
}

impl TestApp {
    /// Replies are generated in one shot and returned with the history
    pub fn new() -> Self {
        Self::build(MockLlmService::new(), false)
    }

    /// Replies are streamed in the background
    pub fn streaming(llm: MockLlmService) -> Self {
        Self::build(llm, true)
    }

    /// One-shot replies from a scripted mock
    pub fn with_llm(llm: MockLlmService) -> Self {
        Self::build(llm, false)
    }

    fn build(llm: MockLlmService, streaming_enabled: bool) -> Self {
        let config = test_config(streaming_enabled);
        let llm = Arc::new(llm);
        let store = Arc::new(InMemoryConversationStore::new());
        let hub = Arc::new(StreamHub::new());
        let shutdown = CancellationToken::new();

        let router = tessera_app::build_app(
            &config,
            store.clone(),
            llm.clone(),
            hub.clone(),
            shutdown.clone(),
        );

        Self {
            config,
            llm,
            store,
            hub,
            shutdown,
            router,
        }
    }

    pub fn test_router(&self) -> Router {
        self.router.clone()
    }

    /// Serve the router on an ephemeral local port and return its address
    pub async fn serve(&self) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.test_router();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .unwrap();
        });
        addr
    }

    /// Mint a token for a fresh user
    pub fn new_user(&self) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        let jwt = create_test_jwt(user_id, &self.config.jwt_secret).unwrap();
        (user_id, jwt)
    }

    /// Send one request through a clone of the router
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.test_router().oneshot(req).await.unwrap()
    }

    /// Create a conversation for the token holder and return its id
    pub async fn create_conversation(&self, jwt: &str) -> Uuid {
        let resp = self
            .send(authed_request(
                Method::POST,
                "/v1/conversations",
                jwt,
                Some(serde_json::json!({"title": "Test conversation"})),
            ))
            .await;
        let body = parse_body(resp).await;
        body["id"].as_str().unwrap().parse().unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Create an HS256 access token for `user_id`
pub fn create_test_jwt(user_id: Uuid, secret: &str) -> Result<String> {
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct TestClaims {
        sub: String,
        email: String,
        iat: u64,
        exp: u64,
    }

    let now = chrono::Utc::now().timestamp() as u64;

    let claims = TestClaims {
        sub: user_id.to_string(),
        email: format!("test_{}@tessera.test", user_id.simple()),
        iat: now,
        exp: now + 3600, // 1 hour
    };

    let header = Header::new(Algorithm::HS256);
    let encoding_key = EncodingKey::from_secret(secret.as_ref());

    Ok(jsonwebtoken::encode(&header, &claims, &encoding_key)?)
}

/// Build an authenticated request
pub fn authed_request(method: Method, uri: &str, jwt: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", jwt));
    with_body(builder, body)
}

/// Build a request without credentials
pub fn anonymous_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    with_body(Request::builder().method(method).uri(uri), body)
}

fn with_body(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    if let Some(b) = body {
        builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&b).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    }
}

/// Parse response body as JSON Value
pub async fn parse_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Poll `uri` until it returns an array of at least `len` items
pub async fn wait_for_len(app: &TestApp, uri: &str, jwt: &str, len: usize) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let body = parse_body(app.send(authed_request(Method::GET, uri, jwt, None)).await).await;
        if body.as_array().map_or(0, Vec::len) >= len {
            return body;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {} items at {}: {}",
            len,
            uri,
            body
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
