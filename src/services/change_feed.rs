//! Per-user change feed for bookmark records.
//!
//! The store publishes every committed write; subscribers receive only the
//! events for the user they subscribed with, in emission order.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

use crate::types::bookmark::ChangeEvent;

const DEFAULT_CAPACITY: usize = 256;

/// A published change together with the owner of the affected record.
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub user_id: String,
    pub event: ChangeEvent,
}

/// Broadcast hub for store changes.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<StoreChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a change. Having no subscribers is not an error.
    pub fn publish(&self, user_id: &str, event: ChangeEvent) {
        let _ = self.sender.send(StoreChange {
            user_id: user_id.to_string(),
            event,
        });
    }

    /// Opens a subscription scoped to `user_id`. Dropping it unsubscribes.
    pub fn subscribe(&self, user_id: &str) -> ChangeSubscription {
        ChangeSubscription {
            user_id: user_id.to_string(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription to one user's changes.
pub struct ChangeSubscription {
    user_id: String,
    receiver: broadcast::Receiver<StoreChange>,
}

impl ChangeSubscription {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Waits for the next event for this user. `None` once the feed is closed.
    ///
    /// If the subscriber fell behind, the skipped events are lost; a warning
    /// is logged and delivery resumes with the oldest retained event.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.user_id == self.user_id => return Some(change.event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %self.user_id, skipped, "change feed subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next already-queued event for this user without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(change) if change.user_id == self.user_id => return Some(change.event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(user_id = %self.user_id, skipped, "change feed subscriber lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
