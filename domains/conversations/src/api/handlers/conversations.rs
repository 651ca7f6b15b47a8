//! Conversation management API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_auth::AuthUser;
use tessera_common::{Result, ValidatedJson};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::ConversationsState;
use crate::domain::entities::Conversation;
use crate::domain::state::ConversationState;
use crate::services::NewConversation;

/// Request for creating a conversation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateConversationRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// Linked records used as reply context
    pub idea_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub job_application_id: Option<Uuid>,
}

/// Query params for listing conversations
#[derive(Debug, Deserialize)]
pub struct ListConversationsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

/// Conversation response DTO
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub state: ConversationState,
    pub idea_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub job_application_id: Option<Uuid>,
    pub assigned_agent_id: Option<String>,
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub share_code: Option<String>,
    pub archived_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            state: c.state(),
            id: c.id,
            user_id: c.user_id,
            title: c.title,
            description: c.description,
            idea_id: c.idea_id,
            project_id: c.project_id,
            job_application_id: c.job_application_id,
            assigned_agent_id: c.assigned_agent_id,
            last_assigned_at: c.last_assigned_at,
            share_code: c.share_code,
            archived_at: c.archived_at,
            deleted_at: c.deleted_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Create a new conversation
pub async fn create_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    ValidatedJson(req): ValidatedJson<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>)> {
    let created = state
        .service
        .create_conversation(
            ctx.user_id,
            NewConversation {
                title: req.title,
                description: req.description,
                idea_id: req.idea_id,
                project_id: req.project_id,
                job_application_id: req.job_application_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// List conversations for the authenticated user
pub async fn list_conversations(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Query(query): Query<ListConversationsQuery>,
) -> Result<Json<Vec<ConversationResponse>>> {
    let convs = state
        .service
        .list_conversations(ctx.user_id, query.include_archived)
        .await?;

    let responses: Vec<ConversationResponse> = convs.into_iter().map(Into::into).collect();
    Ok(Json(responses))
}

/// Get a single conversation by ID
pub async fn get_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>> {
    let conv = state.service.get_conversation(id, ctx.user_id).await?;
    Ok(Json(conv.into()))
}

/// Soft-delete a conversation
pub async fn delete_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service.delete(id, ctx.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn archive_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>> {
    let conv = state.service.archive(id, ctx.user_id).await?;
    Ok(Json(conv.into()))
}

pub async fn unarchive_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>> {
    let conv = state.service.unarchive(id, ctx.user_id).await?;
    Ok(Json(conv.into()))
}

/// Bring a soft-deleted conversation back
pub async fn restore_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>> {
    let conv = state.service.restore(id, ctx.user_id).await?;
    Ok(Json(conv.into()))
}
