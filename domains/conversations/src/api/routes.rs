//! Route definitions for Conversations domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{assignments, conversations, messages, stream, transcripts};
use super::middleware::ConversationsState;

/// Create conversation routes
fn conversation_routes() -> Router<ConversationsState> {
    Router::new()
        .route(
            "/v1/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/v1/conversations/{id}",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route(
            "/v1/conversations/{id}/archive",
            post(conversations::archive_conversation),
        )
        .route(
            "/v1/conversations/{id}/unarchive",
            post(conversations::unarchive_conversation),
        )
        .route(
            "/v1/conversations/{id}/restore",
            post(conversations::restore_conversation),
        )
}

/// Create message routes
fn message_routes() -> Router<ConversationsState> {
    Router::new().route(
        "/v1/conversations/{conversation_id}/messages",
        get(messages::list_messages).post(messages::append_message),
    )
}

/// Create transcript routes
fn transcript_routes() -> Router<ConversationsState> {
    Router::new()
        .route(
            "/v1/conversations/{conversation_id}/transcripts",
            post(transcripts::share_transcript),
        )
        .route(
            "/v1/transcripts/{share_code}",
            get(transcripts::get_shared_transcript),
        )
}

/// Create assignment routes
fn assignment_routes() -> Router<ConversationsState> {
    Router::new().route(
        "/v1/conversations/{conversation_id}/assignments",
        get(assignments::list_assignments)
            .post(assignments::assign_agent)
            .delete(assignments::unassign_agent),
    )
}

/// Create the live stream route
fn stream_routes() -> Router<ConversationsState> {
    Router::new().route(
        "/v1/conversations/{conversation_id}/stream",
        get(stream::subscribe),
    )
}

/// Create all Conversations domain API routes
pub fn routes() -> Router<ConversationsState> {
    Router::new()
        .merge(conversation_routes())
        .merge(message_routes())
        .merge(transcript_routes())
        .merge(assignment_routes())
        .merge(stream_routes())
}
