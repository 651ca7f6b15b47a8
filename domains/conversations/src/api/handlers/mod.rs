//! Request handlers

pub mod assignments;
pub mod conversations;
pub mod messages;
pub mod stream;
pub mod transcripts;
