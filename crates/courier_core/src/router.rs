use std::sync::Arc;

use tracing::instrument;

use crate::{
    category::{DEFAULT_ACTION, REPLY_ACTION, RETRY_TASK_ACTION, VIEW_TASK_ACTION},
    collaborators::{MessageSender, TaskRetrier},
    events::{EventBus, RoutedEvent},
    model::{
        payload_id, payload_str, NotificationResponse, Payload, KEY_CONVERSATION_ID, KEY_TASK_ID,
        KEY_TYPE, TYPE_MESSAGE, TYPE_TASK_COMPLETION,
    },
};

/// What a notification response asks the application to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAction {
    Navigate(RoutedEvent),
    RetryTask { task_id: String },
    Reply { conversation_id: String, text: String },
    Ignore,
}

/// Maps a response onto an action. Unknown action ids and responses missing the
/// keys they need resolve to `Ignore`.
pub fn route(response: &NotificationResponse) -> RouteAction {
    let payload = &response.payload;
    match response.action_id.as_str() {
        DEFAULT_ACTION => route_default_tap(payload),
        // No task id means no screen to open, so nothing is emitted.
        VIEW_TASK_ACTION => payload_id(payload, KEY_TASK_ID)
            .map(|task_id| RouteAction::Navigate(RoutedEvent::task(task_id)))
            .unwrap_or(RouteAction::Ignore),
        RETRY_TASK_ACTION => payload_id(payload, KEY_TASK_ID)
            .map(|task_id| RouteAction::RetryTask { task_id })
            .unwrap_or(RouteAction::Ignore),
        REPLY_ACTION => {
            let text = response
                .user_text
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty());
            match (payload_id(payload, KEY_CONVERSATION_ID), text) {
                (Some(conversation_id), Some(text)) => RouteAction::Reply {
                    conversation_id,
                    text: text.to_string(),
                },
                _ => RouteAction::Ignore,
            }
        }
        _ => RouteAction::Ignore,
    }
}

fn route_default_tap(payload: &Payload) -> RouteAction {
    let event = match payload_str(payload, KEY_TYPE) {
        Some(TYPE_TASK_COMPLETION) => payload_id(payload, KEY_TASK_ID).map(RoutedEvent::task),
        Some(TYPE_MESSAGE) => {
            payload_id(payload, KEY_CONVERSATION_ID).map(RoutedEvent::conversation)
        }
        _ => None,
    };
    event.map(RouteAction::Navigate).unwrap_or(RouteAction::Ignore)
}

/// Executes routed actions against the event bus and collaborators.
pub struct ResponseRouter {
    bus: EventBus,
    retrier: Arc<dyn TaskRetrier>,
    sender: Arc<dyn MessageSender>,
}

impl ResponseRouter {
    pub fn new(bus: EventBus, retrier: Arc<dyn TaskRetrier>, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            bus,
            retrier,
            sender,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Handles one delivered response and returns the event emitted, if any.
    /// Collaborator failures are logged and dropped.
    #[instrument(skip(self, response), fields(action = %response.action_id))]
    pub async fn handle_response(&self, response: NotificationResponse) -> Option<RoutedEvent> {
        match route(&response) {
            RouteAction::Navigate(event) => {
                self.bus.publish(event.clone());
                Some(event)
            }
            RouteAction::RetryTask { task_id } => {
                if let Err(err) = self.retrier.retry_task(&task_id).await {
                    tracing::warn!(task_id = %task_id, error = %err, "task retry from notification failed");
                }
                None
            }
            RouteAction::Reply {
                conversation_id,
                text,
            } => {
                if let Err(err) = self.sender.send_reply(&conversation_id, &text).await {
                    tracing::warn!(conversation_id = %conversation_id, error = %err, "inline reply failed");
                }
                None
            }
            RouteAction::Ignore => {
                tracing::debug!("notification response ignored");
                None
            }
        }
    }
}
