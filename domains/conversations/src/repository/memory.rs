//! In-process `ConversationStore`
//!
//! Used when no database is configured and by tests. All state sits behind a
//! single mutex, so multi-record writes are atomic like their SQL counterparts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tessera_common::{Error, RepositoryError, Result};
use uuid::Uuid;

use super::ConversationStore;
use crate::domain::entities::{
    Conversation, ConversationAssignment, ConversationTranscript, LifecycleMarkers, Message,
};

#[derive(Debug, Default)]
struct Tables {
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<Message>,
    transcripts: HashMap<String, ConversationTranscript>,
    assignments: Vec<ConversationAssignment>,
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    tables: Mutex<Tables>,
    touch_failures: AtomicBool,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `touch_conversation` call fail (for exercising best-effort paths)
    pub fn fail_touches(&self, fail: bool) {
        self.touch_failures.store(fail, Ordering::SeqCst);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn close_open(
    tables: &mut Tables,
    conversation_id: Uuid,
    at: DateTime<Utc>,
) -> Option<ConversationAssignment> {
    let mut closed = None;
    for assignment in tables
        .assignments
        .iter_mut()
        .filter(|a| a.conversation_id == conversation_id && a.is_open())
    {
        assignment.close(at);
        closed = Some(assignment.clone());
    }
    closed
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
        let mut tables = self.tables();
        if tables.conversations.contains_key(&conversation.id) {
            return Err(RepositoryError::DuplicateKey("Conversation id").into());
        }
        tables
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation.clone())
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        Ok(self.tables().conversations.get(&id).cloned())
    }

    async fn list_conversations(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Conversation>> {
        let mut convs: Vec<Conversation> = self
            .tables()
            .conversations
            .values()
            .filter(|c| c.user_id == user_id && !c.is_deleted())
            .filter(|c| include_archived || !c.is_archived())
            .cloned()
            .collect();
        convs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(convs)
    }

    async fn update_lifecycle(
        &self,
        conversation: &Conversation,
        expected: LifecycleMarkers,
    ) -> Result<Option<Conversation>> {
        let mut tables = self.tables();
        match tables.conversations.get_mut(&conversation.id) {
            Some(stored) if stored.lifecycle_markers() == expected => {
                stored.archived_at = conversation.archived_at;
                stored.deleted_at = conversation.deleted_at;
                stored.touch();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn link_share_code(
        &self,
        conversation_id: Uuid,
        share_code: &str,
    ) -> Result<Option<Conversation>> {
        let mut tables = self.tables();
        match tables.conversations.get_mut(&conversation_id) {
            Some(stored) if !stored.is_deleted() => {
                stored.set_share_code(share_code);
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn touch_conversation(&self, id: Uuid) -> Result<()> {
        if self.touch_failures.load(Ordering::SeqCst) {
            return Err(Error::Internal("touch failed".to_string()));
        }
        if let Some(conv) = self.tables().conversations.get_mut(&id) {
            conv.touch();
        }
        Ok(())
    }

    async fn create_message(&self, message: &Message) -> Result<Message> {
        let mut tables = self.tables();
        if !tables.conversations.contains_key(&message.conversation_id) {
            return Err(RepositoryError::Missing("Conversation").into());
        }
        tables.messages.push(message.clone());
        Ok(message.clone())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        Ok(self
            .tables()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn create_transcript(
        &self,
        transcript: &ConversationTranscript,
    ) -> Result<ConversationTranscript> {
        let mut tables = self.tables();
        if tables.transcripts.contains_key(&transcript.share_code) {
            return Err(RepositoryError::DuplicateKey("Share code").into());
        }
        tables
            .transcripts
            .insert(transcript.share_code.clone(), transcript.clone());
        Ok(transcript.clone())
    }

    async fn find_transcript(&self, share_code: &str) -> Result<Option<ConversationTranscript>> {
        Ok(self.tables().transcripts.get(share_code).cloned())
    }

    async fn replace_assignment(
        &self,
        assignment: &ConversationAssignment,
    ) -> Result<ConversationAssignment> {
        let mut tables = self.tables();
        let conversation_id = assignment.conversation_id;
        let at = assignment.assigned_at;

        let Some(conv) = tables.conversations.get_mut(&conversation_id) else {
            return Err(RepositoryError::Missing("Conversation").into());
        };
        conv.assign_agent(&assignment.agent_id, at);

        close_open(&mut tables, conversation_id, at);
        tables.assignments.push(assignment.clone());
        Ok(assignment.clone())
    }

    async fn close_assignment(
        &self,
        conversation_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<ConversationAssignment>> {
        let mut tables = self.tables();

        let Some(conv) = tables.conversations.get_mut(&conversation_id) else {
            return Err(RepositoryError::Missing("Conversation").into());
        };
        conv.clear_agent();

        Ok(close_open(&mut tables, conversation_id, at))
    }

    async fn list_assignments(&self, conversation_id: Uuid) -> Result<Vec<ConversationAssignment>> {
        Ok(self
            .tables()
            .assignments
            .iter()
            .filter(|a| a.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}
