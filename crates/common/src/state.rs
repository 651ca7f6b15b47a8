//! Lifecycle transition errors
//!
//! Shared by domain crates that validate lifecycle changes before persisting them.

use thiserror::Error;

use crate::error::Error as AppError;

/// Errors that can occur while applying a lifecycle event
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid transition: cannot {event} a conversation that is {from}")]
    InvalidTransition { from: String, event: String },

    #[error("Record is deleted and must be restored before it can {0}")]
    Deleted(String),
}

impl From<StateError> for AppError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::InvalidTransition { .. } => AppError::Validation(err.to_string()),
            StateError::Deleted(_) => AppError::Authorization(err.to_string()),
        }
    }
}
