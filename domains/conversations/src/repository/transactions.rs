//! Transaction helpers for the Conversations domain
//!
//! Assignment changes touch two tables and must land together.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use tessera_common::Result;
use uuid::Uuid;

use crate::domain::entities::ConversationAssignment;

/// Close whatever assignment is open for a conversation
pub async fn close_open_assignments_tx(
    tx: &mut Transaction<'_, Postgres>,
    conversation_id: Uuid,
    at: DateTime<Utc>,
) -> Result<Vec<ConversationAssignment>> {
    let closed = sqlx::query_as::<_, ConversationAssignment>(
        r#"
        UPDATE conversation_assignments
        SET unassigned_at = $2
        WHERE conversation_id = $1 AND unassigned_at IS NULL
        RETURNING id, conversation_id, agent_id, assigned_at, unassigned_at
        "#,
    )
    .bind(conversation_id)
    .bind(at)
    .fetch_all(&mut **tx)
    .await?;

    Ok(closed)
}

pub async fn create_assignment_tx(
    tx: &mut Transaction<'_, Postgres>,
    assignment: &ConversationAssignment,
) -> Result<ConversationAssignment> {
    let created = sqlx::query_as::<_, ConversationAssignment>(
        r#"
        INSERT INTO conversation_assignments (
            id, conversation_id, agent_id, assigned_at, unassigned_at
        )
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, conversation_id, agent_id, assigned_at, unassigned_at
        "#,
    )
    .bind(assignment.id)
    .bind(assignment.conversation_id)
    .bind(&assignment.agent_id)
    .bind(assignment.assigned_at)
    .bind(assignment.unassigned_at)
    .fetch_one(&mut **tx)
    .await?;

    Ok(created)
}

/// Point the conversation at its current agent (or none)
pub async fn set_assigned_agent_tx(
    tx: &mut Transaction<'_, Postgres>,
    conversation_id: Uuid,
    agent_id: Option<&str>,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE conversations SET
            assigned_agent_id = $2,
            last_assigned_at = CASE WHEN $2 IS NULL THEN last_assigned_at ELSE $3 END,
            updated_at = $3
        WHERE id = $1
        "#,
    )
    .bind(conversation_id)
    .bind(agent_id)
    .bind(at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
