//! Conversation services

pub mod context;
pub mod conversations;
pub mod locks;
pub mod reply;

pub use context::{ContextBuilder, ContextSource};
pub use conversations::{AppendMessage, ConversationService, NewConversation};
pub use locks::KeyedLocks;
pub use reply::{ReplyOptions, ReplyOrchestrator, StreamOutcome};
