//! WebSocket subscription to a conversation's live events
//!
//! The handshake is always accepted so that a refusal can carry a reason:
//! unauthenticated or unauthorized clients get a policy-violation close frame
//! (1008) right after the upgrade.
//!
//! An accepted connection is split in two. A writer task drains the
//! subscriber queue into text frames; the handler itself reads (and ignores)
//! inbound frames until the client leaves. Either side ending unregisters
//! the subscriber.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tessera_auth::{AuthContext, AuthError, StreamAuth};
use tessera_common::Error;
use uuid::Uuid;

use crate::api::middleware::ConversationsState;
use crate::services::ConversationService;
use crate::streaming::{StreamHub, Subscriber};

/// Open a live subscription to `conversation_id`
pub async fn subscribe(
    StreamAuth(auth): StreamAuth,
    State(state): State<ConversationsState>,
    Path(conversation_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    let decision = authorize_subscription(&state.service, auth, conversation_id).await;

    ws.on_upgrade(move |socket| async move {
        match decision {
            Ok(user_id) => {
                tracing::info!(conversation_id = %conversation_id, user_id = %user_id, "Stream subscriber connected");
                serve(socket, state.hub, conversation_id, state.subscriber_capacity).await;
                tracing::info!(conversation_id = %conversation_id, user_id = %user_id, "Stream subscriber disconnected");
            }
            Err(reason) => refuse(socket, reason).await,
        }
    })
}

/// Decide whether the caller may watch `conversation_id`; the error is the close reason
pub async fn authorize_subscription(
    service: &ConversationService,
    auth: std::result::Result<AuthContext, AuthError>,
    conversation_id: Uuid,
) -> std::result::Result<Uuid, String> {
    let ctx = auth.map_err(|e| e.message().to_string())?;

    match service.get_conversation(conversation_id, ctx.user_id).await {
        Ok(conv) if conv.is_deleted() => Err("Conversation is deleted".to_string()),
        Ok(_) => Ok(ctx.user_id),
        Err(Error::NotFound(message)) => Err(message),
        Err(e) => {
            tracing::error!(conversation_id = %conversation_id, error = %e, "Stream authorization failed");
            Err("Subscription unavailable".to_string())
        }
    }
}

async fn refuse(mut socket: WebSocket, reason: String) {
    tracing::debug!(reason = %reason, "Refusing stream subscription");
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: reason.into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %e, "Failed to send close frame");
    }
}

async fn serve(socket: WebSocket, hub: Arc<StreamHub>, conversation_id: Uuid, capacity: usize) {
    let (subscriber, mut events) = Subscriber::channel(capacity);
    let subscriber_id = subscriber.id();
    hub.register(conversation_id, subscriber);

    let (mut sink, mut inbound) = socket.split();

    // Ends when the hub drops this subscriber or the socket stops accepting writes
    let mut writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode stream event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    let reader = async {
        while let Some(Ok(frame)) = inbound.next().await {
            if let Message::Close(_) = frame {
                break;
            }
        }
    };

    let writer_finished = tokio::select! {
        _ = &mut writer => true,
        _ = reader => false,
    };

    hub.unregister(conversation_id, subscriber_id);
    if !writer_finished {
        let _ = writer.await;
    }
}
