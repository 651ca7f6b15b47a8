//! Agent assignment repository

use crate::domain::entities::ConversationAssignment;
use sqlx::PgPool;
use tessera_common::Result;
use uuid::Uuid;

#[derive(Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Full assignment history, oldest first
    pub async fn list_by_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<ConversationAssignment>> {
        let assignments = sqlx::query_as::<_, ConversationAssignment>(
            r#"
            SELECT id, conversation_id, agent_id, assigned_at, unassigned_at
            FROM conversation_assignments
            WHERE conversation_id = $1
            ORDER BY assigned_at ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    pub async fn find_open(&self, conversation_id: Uuid) -> Result<Option<ConversationAssignment>> {
        let assignment = sqlx::query_as::<_, ConversationAssignment>(
            r#"
            SELECT id, conversation_id, agent_id, assigned_at, unassigned_at
            FROM conversation_assignments
            WHERE conversation_id = $1 AND unassigned_at IS NULL
            ORDER BY assigned_at DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }
}
