//! Agent assignment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_auth::AuthUser;
use tessera_common::{Error, Result, ValidatedJson};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::ConversationsState;
use crate::domain::entities::ConversationAssignment;

#[derive(Debug, Deserialize, Validate)]
pub struct AssignAgentRequest {
    #[validate(length(min = 1, max = 100))]
    pub agent_id: String,
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub agent_id: String,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub open: bool,
}

impl From<ConversationAssignment> for AssignmentResponse {
    fn from(a: ConversationAssignment) -> Self {
        Self {
            open: a.is_open(),
            id: a.id,
            conversation_id: a.conversation_id,
            agent_id: a.agent_id,
            assigned_at: a.assigned_at,
            unassigned_at: a.unassigned_at,
        }
    }
}

/// Assignment history, oldest first
pub async fn list_assignments(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Vec<AssignmentResponse>>> {
    let assignments = state
        .service
        .list_assignments(conversation_id, ctx.user_id)
        .await?;

    Ok(Json(assignments.into_iter().map(Into::into).collect()))
}

/// Assign an agent, closing the current assignment
pub async fn assign_agent(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AssignAgentRequest>,
) -> Result<(StatusCode, Json<AssignmentResponse>)> {
    let assignment = state
        .service
        .assign_agent(conversation_id, ctx.user_id, &req.agent_id)
        .await?;

    Ok((StatusCode::CREATED, Json(assignment.into())))
}

/// Close the current assignment
pub async fn unassign_agent(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>> {
    let closed = state
        .service
        .unassign_agent(conversation_id, ctx.user_id)
        .await?
        .ok_or_else(|| Error::NotFound("No agent is assigned".to_string()))?;

    Ok(Json(closed.into()))
}
