//! Conversation repository

use crate::domain::entities::{Conversation, LifecycleMarkers};
use sqlx::PgPool;
use tessera_common::Result;
use uuid::Uuid;

#[derive(Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find conversation by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<Conversation>> {
        let conv = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user_id, title, description, idea_id, project_id,
                   job_application_id, assigned_agent_id, last_assigned_at,
                   share_code, archived_at, deleted_at, created_at, updated_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conv)
    }

    /// List a user's conversations, most recently active first. Deleted
    /// conversations are never listed.
    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Conversation>> {
        let convs = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT id, user_id, title, description, idea_id, project_id,
                   job_application_id, assigned_agent_id, last_assigned_at,
                   share_code, archived_at, deleted_at, created_at, updated_at
            FROM conversations
            WHERE user_id = $1
              AND deleted_at IS NULL
              AND ($2 OR archived_at IS NULL)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await?;

        Ok(convs)
    }

    /// Create a new conversation
    pub async fn create(&self, conv: &Conversation) -> Result<Conversation> {
        let created = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (
                id, user_id, title, description, idea_id, project_id,
                job_application_id, assigned_agent_id, last_assigned_at,
                share_code, archived_at, deleted_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id, user_id, title, description, idea_id, project_id,
                      job_application_id, assigned_agent_id, last_assigned_at,
                      share_code, archived_at, deleted_at, created_at, updated_at
            "#,
        )
        .bind(conv.id)
        .bind(conv.user_id)
        .bind(&conv.title)
        .bind(&conv.description)
        .bind(conv.idea_id)
        .bind(conv.project_id)
        .bind(conv.job_application_id)
        .bind(&conv.assigned_agent_id)
        .bind(conv.last_assigned_at)
        .bind(&conv.share_code)
        .bind(conv.archived_at)
        .bind(conv.deleted_at)
        .bind(conv.created_at)
        .bind(conv.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Compare-and-set the lifecycle markers
    pub async fn update_lifecycle(
        &self,
        conv: &Conversation,
        expected: LifecycleMarkers,
    ) -> Result<Option<Conversation>> {
        let updated = sqlx::query_as::<_, Conversation>(
            r#"
            UPDATE conversations SET
                archived_at = $2,
                deleted_at = $3,
                updated_at = NOW()
            WHERE id = $1
              AND archived_at IS NOT DISTINCT FROM $4
              AND deleted_at IS NOT DISTINCT FROM $5
            RETURNING id, user_id, title, description, idea_id, project_id,
                      job_application_id, assigned_agent_id, last_assigned_at,
                      share_code, archived_at, deleted_at, created_at, updated_at
            "#,
        )
        .bind(conv.id)
        .bind(conv.archived_at)
        .bind(conv.deleted_at)
        .bind(expected.archived_at)
        .bind(expected.deleted_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Link a shared transcript; deleted conversations are left alone
    pub async fn set_share_code(&self, id: Uuid, share_code: &str) -> Result<Option<Conversation>> {
        let updated = sqlx::query_as::<_, Conversation>(
            r#"
            UPDATE conversations SET
                share_code = $2,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, user_id, title, description, idea_id, project_id,
                      job_application_id, assigned_agent_id, last_assigned_at,
                      share_code, archived_at, deleted_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(share_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Refresh the last-activity timestamp
    pub async fn touch(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
