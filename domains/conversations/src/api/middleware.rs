//! Conversations domain state and auth backend integration

use crate::services::ConversationService;
use crate::streaming::StreamHub;
use axum::extract::FromRef;
use std::sync::Arc;
use tessera_auth::AuthBackend;

/// Application state for the Conversations domain
#[derive(Clone)]
pub struct ConversationsState {
    pub service: Arc<ConversationService>,
    pub hub: Arc<StreamHub>,
    pub auth: AuthBackend,
    /// Outbound queue depth per WebSocket subscriber
    pub subscriber_capacity: usize,
}

impl FromRef<ConversationsState> for AuthBackend {
    fn from_ref(state: &ConversationsState) -> Self {
        state.auth.clone()
    }
}
