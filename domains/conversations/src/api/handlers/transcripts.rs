//! Transcript sharing handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tessera_auth::AuthUser;
use tessera_common::{Error, Result, ValidatedJson};
use uuid::Uuid;
use validator::Validate;

use super::messages::MessageResponse;
use crate::api::middleware::ConversationsState;
use crate::domain::entities::ConversationTranscript;

/// Request for sharing a transcript
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ShareTranscriptRequest {
    /// Lifetime in seconds; missing or zero means seven days
    #[validate(range(max = 31_536_000))]
    pub expire_after_secs: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub share_code: String,
    pub conversation_id: Uuid,
    pub messages: Vec<MessageResponse>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ConversationTranscript> for TranscriptResponse {
    type Error = tessera_common::Error;

    fn try_from(t: ConversationTranscript) -> Result<Self> {
        Ok(Self {
            messages: t.messages()?.into_iter().map(Into::into).collect(),
            share_code: t.share_code,
            conversation_id: t.conversation_id,
            expires_at: t.expires_at,
            created_at: t.created_at,
        })
    }
}

/// Zero or negative lifetimes fall back to the default TTL
fn expire_after(secs: Option<i64>) -> Result<Option<Duration>> {
    match secs.filter(|s| *s > 0) {
        Some(secs) => Duration::try_seconds(secs)
            .map(Some)
            .ok_or_else(|| Error::Validation("expire_after_secs is out of range".to_string())),
        None => Ok(None),
    }
}

/// Freeze the conversation's history under a new share code
pub async fn share_transcript(
    AuthUser(ctx): AuthUser,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ShareTranscriptRequest>,
) -> Result<(StatusCode, Json<TranscriptResponse>)> {
    let transcript = state
        .service
        .share_transcript(
            conversation_id,
            ctx.user_id,
            expire_after(req.expire_after_secs)?,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(TranscriptResponse::try_from(transcript)?)))
}

/// Public read of a shared transcript
pub async fn get_shared_transcript(
    State(state): State<ConversationsState>,
    Path(share_code): Path<String>,
) -> Result<Json<TranscriptResponse>> {
    let transcript = state.service.get_shared_transcript(&share_code).await?;
    Ok(Json(TranscriptResponse::try_from(transcript)?))
}
