//! Events pushed to conversation subscribers
//!
//! Serialized as one JSON object per WebSocket text frame, discriminated by `type`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{Message, MessageRole};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum StreamEvent {
    /// One generated chunk of an in-flight reply
    Delta { conversation_id: Uuid, delta: String },
    /// A persisted message
    Message(MessageEvent),
    /// An in-flight reply was abandoned
    Error {
        conversation_id: Uuid,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StreamEvent {
    pub fn delta(conversation_id: Uuid, delta: impl Into<String>) -> Self {
        StreamEvent::Delta {
            conversation_id,
            delta: delta.into(),
        }
    }

    pub fn error(conversation_id: Uuid, message: impl Into<String>) -> Self {
        StreamEvent::Error {
            conversation_id,
            message: message.into(),
        }
    }
}

impl From<&Message> for StreamEvent {
    fn from(message: &Message) -> Self {
        StreamEvent::Message(MessageEvent {
            id: message.id,
            conversation_id: message.conversation_id,
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at,
        })
    }
}
