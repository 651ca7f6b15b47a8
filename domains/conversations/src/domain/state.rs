//! Lifecycle transitions for conversations
//!
//! Active ↔ Archived, either → Deleted, Deleted → Active (restore)

pub use tessera_common::StateError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    Active,
    Archived,
    Deleted,
}

impl ConversationState {
    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [ConversationState] {
        match self {
            Self::Active => &[Self::Archived, Self::Deleted],
            Self::Archived => &[Self::Active, Self::Deleted],
            Self::Deleted => &[Self::Active],
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// Events that trigger conversation state transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversationEvent {
    Archive,
    Unarchive,
    Delete,
    Restore,
}

impl std::fmt::Display for ConversationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::Unarchive => write!(f, "unarchive"),
            Self::Delete => write!(f, "delete"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// Conversation state machine
pub struct ConversationStateMachine;

impl ConversationStateMachine {
    /// Attempt a state transition
    pub fn transition(
        current: ConversationState,
        event: ConversationEvent,
    ) -> Result<ConversationState, StateError> {
        use ConversationEvent as E;
        use ConversationState as S;

        let next = match (current, event) {
            (S::Active, E::Archive) => S::Archived,
            (S::Archived, E::Unarchive) => S::Active,
            (S::Active | S::Archived, E::Delete) => S::Deleted,
            (S::Deleted, E::Restore) => S::Active,
            (S::Deleted, E::Archive | E::Unarchive) => {
                return Err(StateError::Deleted(format!("be {}d", event)));
            }
            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }
}
