//! Conversation coordinator
//!
//! Entry point for every conversation operation: ownership and lifecycle
//! checks, message appends with optional assistant replies, transcript
//! sharing, and agent assignment.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tessera_common::{Error, Result};
use uuid::Uuid;

use super::locks::KeyedLocks;
use super::reply::{ReplyOptions, ReplyOrchestrator};
use crate::domain::entities::{
    Conversation, ConversationAssignment, ConversationTranscript, Message, MessageRole,
};
use crate::domain::state::StateError;
use crate::repository::ConversationStore;
use crate::streaming::{StreamEvent, StreamHub};

/// Input for creating a conversation
#[derive(Debug, Clone, Default)]
pub struct NewConversation {
    pub title: Option<String>,
    pub description: Option<String>,
    pub idea_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub job_application_id: Option<Uuid>,
}

/// Input for appending a message
#[derive(Debug, Clone)]
pub struct AppendMessage {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub content: String,
    pub generate_reply: bool,
    pub reply: ReplyOptions,
}

pub struct ConversationService {
    store: Arc<dyn ConversationStore>,
    hub: Option<Arc<StreamHub>>,
    replies: Arc<ReplyOrchestrator>,
    streaming_enabled: bool,
    conversation_locks: KeyedLocks,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        hub: Option<Arc<StreamHub>>,
        replies: Arc<ReplyOrchestrator>,
    ) -> Self {
        Self {
            store,
            hub,
            replies,
            streaming_enabled: true,
            conversation_locks: KeyedLocks::new(),
        }
    }

    /// Turn streaming replies off; replies are then generated in one call
    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.streaming_enabled = enabled;
        self
    }

    /// Load a conversation owned by `user_id`. Foreign and missing
    /// conversations are indistinguishable.
    pub async fn get_conversation(&self, id: Uuid, user_id: Uuid) -> Result<Conversation> {
        self.store
            .find_conversation(id)
            .await?
            .filter(|conv| conv.user_id == user_id)
            .ok_or_else(|| Error::NotFound("Conversation not found".to_string()))
    }

    /// Load an owned conversation that has not been soft-deleted
    async fn get_live_conversation(
        &self,
        id: Uuid,
        user_id: Uuid,
        action: &str,
    ) -> Result<Conversation> {
        let conv = self.get_conversation(id, user_id).await?;
        if conv.is_deleted() {
            return Err(StateError::Deleted(action.to_string()).into());
        }
        Ok(conv)
    }

    pub async fn create_conversation(
        &self,
        user_id: Uuid,
        input: NewConversation,
    ) -> Result<Conversation> {
        let conv = Conversation::new(user_id, input.title, input.description)?
            .with_idea(input.idea_id)
            .with_project(input.project_id)
            .with_job_application(input.job_application_id);

        let created = self.store.create_conversation(&conv).await?;
        tracing::info!(conversation_id = %created.id, user_id = %user_id, "Conversation created");
        Ok(created)
    }

    pub async fn list_conversations(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Conversation>> {
        self.store
            .list_conversations(user_id, include_archived)
            .await
    }

    /// Append a message and, when asked, produce the assistant's reply.
    ///
    /// Returns the full history. A streamed reply is still in flight when
    /// this returns; it reaches subscribers through the stream hub. Reply
    /// failures never fail the append itself.
    pub async fn append_message(&self, input: AppendMessage) -> Result<Vec<Message>> {
        let conv = self
            .get_live_conversation(input.conversation_id, input.user_id, "receive messages")
            .await?;

        let role: MessageRole = input.role.parse()?;
        let message = Message::new(conv.id, role, input.content)?;
        let stored = self.store.create_message(&message).await?;

        if let Some(hub) = &self.hub {
            hub.broadcast(conv.id, &StreamEvent::from(&stored));
        }

        if let Err(e) = self.store.touch_conversation(conv.id).await {
            tracing::warn!(conversation_id = %conv.id, error = %e, "Failed to refresh conversation activity");
        }

        if input.generate_reply {
            self.reply(conv, input.reply).await;
        }

        tracing::debug!(conversation_id = %stored.conversation_id, message_id = %stored.id, role = %stored.role, "Message appended");
        self.store.list_messages(stored.conversation_id).await
    }

    async fn reply(&self, conv: Conversation, options: ReplyOptions) {
        if self.streaming_enabled && self.replies.can_stream() {
            if let Err(e) = self.replies.stream_reply(conv, options) {
                tracing::error!(error = %e, "Failed to start streaming reply");
            }
            return;
        }

        match self.replies.generate_reply(&conv, &options).await {
            Ok(reply) => {
                if let Some(hub) = &self.hub {
                    hub.broadcast(conv.id, &StreamEvent::from(&reply));
                }
            }
            Err(e) => {
                tracing::error!(conversation_id = %conv.id, error = %e, "Assistant reply failed");
            }
        }
    }

    pub async fn list_messages(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Vec<Message>> {
        let conv = self.get_conversation(conversation_id, user_id).await?;
        self.store.list_messages(conv.id).await
    }

    pub async fn archive(&self, id: Uuid, user_id: Uuid) -> Result<Conversation> {
        self.apply_lifecycle(id, user_id, Conversation::archive).await
    }

    pub async fn unarchive(&self, id: Uuid, user_id: Uuid) -> Result<Conversation> {
        self.apply_lifecycle(id, user_id, Conversation::unarchive).await
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<Conversation> {
        self.apply_lifecycle(id, user_id, Conversation::soft_delete).await
    }

    pub async fn restore(&self, id: Uuid, user_id: Uuid) -> Result<Conversation> {
        self.apply_lifecycle(id, user_id, Conversation::restore).await
    }

    async fn apply_lifecycle(
        &self,
        id: Uuid,
        user_id: Uuid,
        change: fn(&mut Conversation) -> std::result::Result<(), StateError>,
    ) -> Result<Conversation> {
        let _guard = self.conversation_locks.acquire(id).await;
        let mut conv = self.get_conversation(id, user_id).await?;
        let expected = conv.lifecycle_markers();
        change(&mut conv)?;

        let updated = self
            .store
            .update_lifecycle(&conv, expected)
            .await?
            .ok_or_else(|| Error::Conflict("Conversation was modified concurrently".to_string()))?;
        tracing::info!(conversation_id = %id, state = %updated.state(), "Conversation lifecycle changed");
        Ok(updated)
    }

    /// Freeze the current history into a shareable transcript
    pub async fn share_transcript(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        expire_after: Option<Duration>,
    ) -> Result<ConversationTranscript> {
        let conv = self
            .get_live_conversation(conversation_id, user_id, "be shared")
            .await?;
        let messages = self.store.list_messages(conv.id).await?;

        let transcript = ConversationTranscript::new(conv.id, &messages, expire_after)?;
        let created = self.store.create_transcript(&transcript).await?;

        match self.store.link_share_code(conv.id, &created.share_code).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(conversation_id = %conv.id, "Conversation deleted before transcript could be linked")
            }
            Err(e) => {
                tracing::warn!(conversation_id = %conv.id, error = %e, "Failed to link shared transcript")
            }
        }

        tracing::info!(conversation_id = %conv.id, messages = messages.len(), "Transcript shared");
        Ok(created)
    }

    /// Fetch a shared transcript; expired and unknown codes look the same
    pub async fn get_shared_transcript(&self, share_code: &str) -> Result<ConversationTranscript> {
        self.store
            .find_transcript(share_code)
            .await?
            .filter(|t| !t.is_expired(Utc::now()))
            .ok_or_else(|| Error::NotFound("Transcript not found".to_string()))
    }

    /// Assign `agent_id`, closing whatever assignment was open
    pub async fn assign_agent(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        agent_id: &str,
    ) -> Result<ConversationAssignment> {
        let conv = self
            .get_live_conversation(conversation_id, user_id, "be assigned")
            .await?;
        let assignment = ConversationAssignment::open(conv.id, agent_id)?;

        let _guard = self.conversation_locks.acquire(conv.id).await;
        let created = self.store.replace_assignment(&assignment).await?;

        tracing::info!(conversation_id = %conv.id, agent_id = %created.agent_id, "Agent assigned");
        Ok(created)
    }

    /// Close the open assignment; `None` when no agent was assigned
    pub async fn unassign_agent(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ConversationAssignment>> {
        let conv = self
            .get_live_conversation(conversation_id, user_id, "be unassigned")
            .await?;

        let _guard = self.conversation_locks.acquire(conv.id).await;
        self.store.close_assignment(conv.id, Utc::now()).await
    }

    pub async fn list_assignments(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<ConversationAssignment>> {
        let conv = self.get_conversation(conversation_id, user_id).await?;
        self.store.list_assignments(conv.id).await
    }
}
