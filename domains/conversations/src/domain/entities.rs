//! Domain entities for the Conversations domain
//!
//! Conversations own an ordered message history, can be shared as frozen
//! transcripts, and keep an audit trail of agent assignments.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tessera_common::{Error, Result};

use super::state::{ConversationEvent, ConversationState, ConversationStateMachine, StateError};

/// Maximum title string length (varchar(200))
const MAX_TITLE_LENGTH: usize = 200;

/// Maximum description length (CHECK length <= 2000)
const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Maximum agent identifier length (varchar(100))
const MAX_AGENT_ID_LENGTH: usize = 100;

/// Lifetime of a shared transcript when the caller does not pick one
pub const DEFAULT_TRANSCRIPT_TTL_DAYS: i64 = 7;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(Error::Validation("Message role is required".to_string())),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(Error::Validation(format!(
                "Unknown message role: {}",
                other
            ))),
        }
    }
}

/// The two soft-delete markers, compared before a lifecycle write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleMarkers {
    pub archived_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Conversation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
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

impl Conversation {
    /// Create a new conversation
    pub fn new(user_id: Uuid, title: Option<String>, description: Option<String>) -> Result<Self> {
        if let Some(ref t) = title {
            if t.chars().count() > MAX_TITLE_LENGTH {
                return Err(Error::Validation(format!(
                    "Title must be at most {} characters",
                    MAX_TITLE_LENGTH
                )));
            }
        }

        if let Some(ref d) = description {
            if d.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(Error::Validation(format!(
                    "Description must be at most {} characters",
                    MAX_DESCRIPTION_LENGTH
                )));
            }
        }

        let now = Utc::now();
        Ok(Conversation {
            id: Uuid::new_v4(),
            user_id,
            title,
            description,
            idea_id: None,
            project_id: None,
            job_application_id: None,
            assigned_agent_id: None,
            last_assigned_at: None,
            share_code: None,
            archived_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_idea(mut self, idea_id: Option<Uuid>) -> Self {
        self.idea_id = idea_id;
        self
    }

    pub fn with_project(mut self, project_id: Option<Uuid>) -> Self {
        self.project_id = project_id;
        self
    }

    pub fn with_job_application(mut self, job_application_id: Option<Uuid>) -> Self {
        self.job_application_id = job_application_id;
        self
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn lifecycle_markers(&self) -> LifecycleMarkers {
        LifecycleMarkers {
            archived_at: self.archived_at,
            deleted_at: self.deleted_at,
        }
    }

    /// Current lifecycle state (deletion dominates archival)
    pub fn state(&self) -> ConversationState {
        if self.is_deleted() {
            ConversationState::Deleted
        } else if self.is_archived() {
            ConversationState::Archived
        } else {
            ConversationState::Active
        }
    }

    /// Refresh the last-activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn archive(&mut self) -> std::result::Result<(), StateError> {
        self.apply(ConversationEvent::Archive)
    }

    pub fn unarchive(&mut self) -> std::result::Result<(), StateError> {
        self.apply(ConversationEvent::Unarchive)
    }

    pub fn soft_delete(&mut self) -> std::result::Result<(), StateError> {
        self.apply(ConversationEvent::Delete)
    }

    pub fn restore(&mut self) -> std::result::Result<(), StateError> {
        self.apply(ConversationEvent::Restore)
    }

    fn apply(&mut self, event: ConversationEvent) -> std::result::Result<(), StateError> {
        let next = ConversationStateMachine::transition(self.state(), event)?;
        let now = Utc::now();

        match next {
            ConversationState::Active => {
                self.archived_at = None;
                self.deleted_at = None;
            }
            ConversationState::Archived => self.archived_at = Some(now),
            ConversationState::Deleted => self.deleted_at = Some(now),
        }
        self.updated_at = now;
        Ok(())
    }

    /// Record `agent_id` as the currently assigned agent
    pub fn assign_agent(&mut self, agent_id: &str, at: DateTime<Utc>) {
        self.assigned_agent_id = Some(agent_id.to_string());
        self.last_assigned_at = Some(at);
        self.updated_at = at;
    }

    pub fn clear_agent(&mut self) {
        self.assigned_agent_id = None;
        self.updated_at = Utc::now();
    }

    /// Link the most recently shared transcript
    pub fn set_share_code(&mut self, share_code: &str) {
        self.share_code = Some(share_code.to_string());
        self.updated_at = Utc::now();
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message (CHECK (length(trim(content)) > 0))
    pub fn new(conversation_id: Uuid, role: MessageRole, content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(Error::Validation(
                "Message content cannot be empty or whitespace-only".to_string(),
            ));
        }

        Ok(Message {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content,
            created_at: Utc::now(),
        })
    }
}

/// A frozen, publicly shareable copy of a conversation's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationTranscript {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub share_code: String,
    /// JSON-serialized message list
    pub content: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConversationTranscript {
    /// Snapshot `messages`. A missing or non-positive `ttl` falls back to seven days.
    pub fn new(conversation_id: Uuid, messages: &[Message], ttl: Option<Duration>) -> Result<Self> {
        let ttl = ttl
            .filter(|ttl| *ttl > Duration::zero())
            .unwrap_or_else(|| Duration::days(DEFAULT_TRANSCRIPT_TTL_DAYS));
        let now = Utc::now();

        Ok(ConversationTranscript {
            id: Uuid::new_v4(),
            conversation_id,
            share_code: Uuid::new_v4().simple().to_string(),
            content: serde_json::to_string(messages)?,
            expires_at: Some(now + ttl),
            created_at: now,
        })
    }

    /// Decode the frozen message list
    pub fn messages(&self) -> Result<Vec<Message>> {
        Ok(serde_json::from_str(&self.content)?)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// One period during which an agent was assigned to a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationAssignment {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub agent_id: String,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
}

impl ConversationAssignment {
    /// Open a new assignment period starting now
    pub fn open(conversation_id: Uuid, agent_id: impl Into<String>) -> Result<Self> {
        let agent_id = agent_id.into().trim().to_string();
        if agent_id.is_empty() {
            return Err(Error::Validation("Agent id is required".to_string()));
        }
        if agent_id.len() > MAX_AGENT_ID_LENGTH {
            return Err(Error::Validation(format!(
                "Agent id must be at most {} characters",
                MAX_AGENT_ID_LENGTH
            )));
        }

        Ok(ConversationAssignment {
            id: Uuid::new_v4(),
            conversation_id,
            agent_id,
            assigned_at: Utc::now(),
            unassigned_at: None,
        })
    }

    pub fn close(&mut self, at: DateTime<Utc>) {
        if self.unassigned_at.is_none() {
            self.unassigned_at = Some(at);
        }
    }

    pub fn is_open(&self) -> bool {
        self.unassigned_at.is_none()
    }
}
