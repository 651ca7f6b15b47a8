//! Persistence for the Conversations domain
//!
//! Services talk to a `ConversationStore`. `ConversationsRepositories` backs it
//! with PostgreSQL; `InMemoryConversationStore` keeps everything in process
//! for local runs and tests.

pub mod assignments;
pub mod conversations;
pub mod memory;
pub mod messages;
pub mod transactions;
pub mod transcripts;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tessera_common::Result;
use uuid::Uuid;

use crate::domain::entities::{
    Conversation, ConversationAssignment, ConversationTranscript, LifecycleMarkers, Message,
};

pub use assignments::AssignmentRepository;
pub use conversations::ConversationRepository;
pub use memory::InMemoryConversationStore;
pub use messages::MessageRepository;
pub use transcripts::TranscriptRepository;

/// Storage capability required by the conversation services
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<Conversation>;

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>>;

    /// Non-deleted conversations of `user_id`, most recently active first
    async fn list_conversations(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Conversation>>;

    /// Write the archive/delete markers of `conversation`, but only while the
    /// stored markers still equal `expected`. `None` when the row is missing
    /// or was changed in between.
    async fn update_lifecycle(
        &self,
        conversation: &Conversation,
        expected: LifecycleMarkers,
    ) -> Result<Option<Conversation>>;

    /// Record a shared transcript's code on a conversation that is not deleted
    async fn link_share_code(
        &self,
        conversation_id: Uuid,
        share_code: &str,
    ) -> Result<Option<Conversation>>;

    /// Refresh `updated_at`
    async fn touch_conversation(&self, id: Uuid) -> Result<()>;

    async fn create_message(&self, message: &Message) -> Result<Message>;

    /// History in insertion order
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>>;

    async fn create_transcript(
        &self,
        transcript: &ConversationTranscript,
    ) -> Result<ConversationTranscript>;

    async fn find_transcript(&self, share_code: &str) -> Result<Option<ConversationTranscript>>;

    /// Close any open assignment, open `assignment`, and point the
    /// conversation at the new agent, as one unit
    async fn replace_assignment(
        &self,
        assignment: &ConversationAssignment,
    ) -> Result<ConversationAssignment>;

    /// Close the open assignment (if any) and clear the conversation's agent
    async fn close_assignment(
        &self,
        conversation_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<ConversationAssignment>>;

    async fn list_assignments(&self, conversation_id: Uuid) -> Result<Vec<ConversationAssignment>>;
}

/// Combined repository access for the Conversations domain
#[derive(Clone)]
pub struct ConversationsRepositories {
    pool: PgPool,
    pub conversations: ConversationRepository,
    pub messages: MessageRepository,
    pub transcripts: TranscriptRepository,
    pub assignments: AssignmentRepository,
}

impl ConversationsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            conversations: ConversationRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            transcripts: TranscriptRepository::new(pool.clone()),
            assignments: AssignmentRepository::new(pool.clone()),
            pool,
        }
    }

    /// Begin a new database transaction.
    pub async fn begin(&self) -> std::result::Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConversationStore for ConversationsRepositories {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
        self.conversations.create(conversation).await
    }

    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        self.conversations.find(id).await
    }

    async fn list_conversations(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Conversation>> {
        self.conversations
            .list_by_user(user_id, include_archived)
            .await
    }

    async fn update_lifecycle(
        &self,
        conversation: &Conversation,
        expected: LifecycleMarkers,
    ) -> Result<Option<Conversation>> {
        self.conversations
            .update_lifecycle(conversation, expected)
            .await
    }

    async fn link_share_code(
        &self,
        conversation_id: Uuid,
        share_code: &str,
    ) -> Result<Option<Conversation>> {
        self.conversations
            .set_share_code(conversation_id, share_code)
            .await
    }

    async fn touch_conversation(&self, id: Uuid) -> Result<()> {
        self.conversations.touch(id).await?;
        Ok(())
    }

    async fn create_message(&self, message: &Message) -> Result<Message> {
        self.messages.create(message).await
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        self.messages.list_by_conversation(conversation_id).await
    }

    async fn create_transcript(
        &self,
        transcript: &ConversationTranscript,
    ) -> Result<ConversationTranscript> {
        self.transcripts.create(transcript).await
    }

    async fn find_transcript(&self, share_code: &str) -> Result<Option<ConversationTranscript>> {
        self.transcripts.find_by_share_code(share_code).await
    }

    async fn replace_assignment(
        &self,
        assignment: &ConversationAssignment,
    ) -> Result<ConversationAssignment> {
        let mut tx = self.begin().await?;

        transactions::close_open_assignments_tx(
            &mut tx,
            assignment.conversation_id,
            assignment.assigned_at,
        )
        .await?;
        let created = transactions::create_assignment_tx(&mut tx, assignment).await?;
        transactions::set_assigned_agent_tx(
            &mut tx,
            assignment.conversation_id,
            Some(&assignment.agent_id),
            assignment.assigned_at,
        )
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn close_assignment(
        &self,
        conversation_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<ConversationAssignment>> {
        let mut tx = self.begin().await?;

        let closed = transactions::close_open_assignments_tx(&mut tx, conversation_id, at).await?;
        transactions::set_assigned_agent_tx(&mut tx, conversation_id, None, at).await?;

        tx.commit().await?;
        Ok(closed.into_iter().next())
    }

    async fn list_assignments(&self, conversation_id: Uuid) -> Result<Vec<ConversationAssignment>> {
        self.assignments.list_by_conversation(conversation_id).await
    }
}
