//! In-process broadcast of navigation events produced by notification responses.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RouteKind {
    TaskCompletion,
    Conversation,
}

/// Navigation request emitted after the user interacts with a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct RoutedEvent {
    pub kind: RouteKind,
    pub target_id: String,
}

impl RoutedEvent {
    pub fn task(task_id: impl Into<String>) -> Self {
        Self {
            kind: RouteKind::TaskCompletion,
            target_id: task_id.into(),
        }
    }

    pub fn conversation(conversation_id: impl Into<String>) -> Self {
        Self {
            kind: RouteKind::Conversation,
            target_id: conversation_id.into(),
        }
    }

    /// Name of the signal navigation listens for.
    pub fn signal_name(&self) -> &'static str {
        match self.kind {
            RouteKind::TaskCompletion => "navigateToTask",
            RouteKind::Conversation => "navigateToConversation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RoutedEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Broadcasts to current subscribers and returns how many were reached.
    pub fn publish(&self, event: RoutedEvent) -> usize {
        let signal = event.signal_name();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(signal, receivers, "routed event published");
                receivers
            }
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(signal, target_id = %event.target_id, "routed event had no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoutedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
