//! Shared transcript repository

use crate::domain::entities::ConversationTranscript;
use sqlx::PgPool;
use tessera_common::{RepositoryError, Result};

#[derive(Clone)]
pub struct TranscriptRepository {
    pool: PgPool,
}

impl TranscriptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, transcript: &ConversationTranscript) -> Result<ConversationTranscript> {
        let created = sqlx::query_as::<_, ConversationTranscript>(
            r#"
            INSERT INTO conversation_transcripts (
                id, conversation_id, share_code, content, expires_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, conversation_id, share_code, content, expires_at, created_at
            "#,
        )
        .bind(transcript.id)
        .bind(transcript.conversation_id)
        .bind(&transcript.share_code)
        .bind(&transcript.content)
        .bind(transcript.expires_at)
        .bind(transcript.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "Share code"))?;

        Ok(created)
    }

    /// Find a transcript by its share code, expired or not
    pub async fn find_by_share_code(&self, share_code: &str) -> Result<Option<ConversationTranscript>> {
        let transcript = sqlx::query_as::<_, ConversationTranscript>(
            r#"
            SELECT id, conversation_id, share_code, content, expires_at, created_at
            FROM conversation_transcripts
            WHERE share_code = $1
            "#,
        )
        .bind(share_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transcript)
    }
}
