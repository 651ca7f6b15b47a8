//! Conversations domain: message history, live reply streaming, shared
//! transcripts, agent assignment

pub mod api;
pub mod domain;
pub mod repository;
pub mod services;
pub mod streaming;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{
    Conversation, ConversationAssignment, ConversationTranscript, LifecycleMarkers, Message,
    MessageRole,
};
pub use domain::state::{
    ConversationEvent, ConversationState, ConversationStateMachine, StateError,
};

// Re-export repository types
pub use repository::{ConversationStore, ConversationsRepositories, InMemoryConversationStore};

// Re-export service types
pub use services::{
    AppendMessage, ContextBuilder, ContextSource, ConversationService, NewConversation,
    ReplyOptions, ReplyOrchestrator, StreamOutcome,
};

// Re-export streaming types
pub use streaming::{StreamEvent, StreamHub, Subscriber};

// Re-export API types
pub use api::routes;
pub use api::ConversationsState;
