//! Message API handlers

use axum::{
    extract::{Path, State},
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
use crate::domain::entities::{Message, MessageRole};
use crate::services::{AppendMessage, ReplyOptions};

fn default_role() -> String {
    MessageRole::User.to_string()
}

/// Request for appending a message
#[derive(Debug, Deserialize, Validate)]
pub struct AppendMessageRequest {
    /// `user`, `assistant` or `system`; defaults to `user`
    #[serde(default = "default_role")]
    pub role: String,

    pub content: String,

    /// Ask the assistant to reply after the message is stored
    #[serde(default)]
    pub generate_reply: bool,

    #[validate(length(max = 100))]
    pub agent: Option<String>,

    #[validate(length(max = 100))]
    pub model: Option<String>,

    #[validate(length(max = 50))]
    pub provider: Option<String>,

    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f32>,
}

/// Message response DTO
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            role: m.role,
            content: m.content,
            created_at: m.created_at,
        }
    }
}

/// Append a message, optionally triggering an assistant reply.
///
/// Responds with the full history. Streamed replies arrive later over the
/// conversation's WebSocket.
pub async fn append_message(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AppendMessageRequest>,
) -> Result<(StatusCode, Json<Vec<MessageResponse>>)> {
    let history = state
        .service
        .append_message(AppendMessage {
            conversation_id,
            user_id: ctx.user_id,
            role: req.role,
            content: req.content,
            generate_reply: req.generate_reply,
            reply: ReplyOptions {
                agent: req.agent,
                model: req.model,
                provider: req.provider,
                temperature: req.temperature,
            },
        })
        .await?;

    let responses: Vec<MessageResponse> = history.into_iter().map(Into::into).collect();
    Ok((StatusCode::CREATED, Json(responses)))
}

/// List messages for a conversation
pub async fn list_messages(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Vec<MessageResponse>>> {
    let messages = state
        .service
        .list_messages(conversation_id, ctx.user_id)
        .await?;

    let responses: Vec<MessageResponse> = messages.into_iter().map(Into::into).collect();
    Ok(Json(responses))
}
