//! Registry of live subscribers, keyed by conversation
//!
//! Every subscriber owns a bounded queue drained by its own writer task.
//! Broadcasting never waits on a connection: a subscriber whose queue is
//! full or whose writer has gone away is dropped from the registry, which
//! closes its queue and lets the writer shut the socket.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::events::StreamEvent;

/// Sending half of one live connection
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: Uuid,
    sender: mpsc::Sender<StreamEvent>,
}

impl Subscriber {
    /// Create a subscriber and the queue its writer drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: Uuid::new_v4(),
                sender,
            },
            receiver,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Conversation id -> subscriber id -> subscriber
#[derive(Debug, Default)]
pub struct StreamHub {
    conversations: RwLock<HashMap<Uuid, HashMap<Uuid, Subscriber>>>,
}

impl StreamHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber to a conversation's set. Registering the same
    /// subscriber twice keeps a single entry.
    pub fn register(&self, conversation_id: Uuid, subscriber: Subscriber) {
        let mut conversations = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        conversations
            .entry(conversation_id)
            .or_default()
            .insert(subscriber.id, subscriber);

        tracing::debug!(conversation_id = %conversation_id, "Stream subscriber registered");
    }

    /// Remove a subscriber; the conversation entry goes with its last subscriber.
    /// Returns whether anything was removed.
    pub fn unregister(&self, conversation_id: Uuid, subscriber_id: Uuid) -> bool {
        let mut conversations = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(subscribers) = conversations.get_mut(&conversation_id) else {
            return false;
        };
        let removed = subscribers.remove(&subscriber_id).is_some();
        if subscribers.is_empty() {
            conversations.remove(&conversation_id);
        }

        if removed {
            tracing::debug!(conversation_id = %conversation_id, "Stream subscriber unregistered");
        }
        removed
    }

    /// Queue `event` for every subscriber of `conversation_id`.
    ///
    /// Runs against a snapshot taken under the read lock, so slow or failing
    /// subscribers never hold up registration. Returns how many subscribers
    /// accepted the event.
    pub fn broadcast(&self, conversation_id: Uuid, event: &StreamEvent) -> usize {
        let snapshot: Vec<Subscriber> = {
            let conversations = self
                .conversations
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match conversations.get(&conversation_id) {
                Some(subscribers) => subscribers.values().cloned().collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for subscriber in snapshot {
            match subscriber.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        subscriber_id = %subscriber.id,
                        "Stream subscriber cannot keep up, disconnecting"
                    );
                    self.unregister(conversation_id, subscriber.id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        conversation_id = %conversation_id,
                        subscriber_id = %subscriber.id,
                        "Dropping closed stream subscriber"
                    );
                    self.unregister(conversation_id, subscriber.id);
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, conversation_id: Uuid) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&conversation_id)
            .map_or(0, HashMap::len)
    }

    /// Number of conversations with at least one subscriber
    pub fn conversation_count(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
