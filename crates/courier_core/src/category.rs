use serde::{Deserialize, Serialize};

pub const TASK_COMPLETION_CATEGORY: &str = "TASK_COMPLETION";
pub const MESSAGE_CATEGORY: &str = "MESSAGE";

pub const VIEW_TASK_ACTION: &str = "VIEW_TASK";
pub const RETRY_TASK_ACTION: &str = "RETRY_TASK";
pub const REPLY_ACTION: &str = "REPLY";

/// Action id reported when the user taps the notification body.
pub const DEFAULT_ACTION: &str = "DEFAULT";
/// Action id reported when the user dismisses the notification.
pub const DISMISS_ACTION: &str = "DISMISS";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionOptions {
    /// Launches the app into the foreground when selected.
    pub foreground: bool,
    pub destructive: bool,
    pub authentication_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextInputSpec {
    pub button_title: String,
    pub placeholder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationAction {
    pub id: String,
    pub label: String,
    pub options: ActionOptions,
    pub text_input: Option<TextInputSpec>,
}

impl NotificationAction {
    pub fn foreground(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            options: ActionOptions {
                foreground: true,
                ..ActionOptions::default()
            },
            text_input: None,
        }
    }

    pub fn background(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            options: ActionOptions::default(),
            text_input: None,
        }
    }

    pub fn text_input(id: &str, label: &str, button_title: &str, placeholder: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            options: ActionOptions::default(),
            text_input: Some(TextInputSpec {
                button_title: button_title.to_string(),
                placeholder: placeholder.to_string(),
            }),
        }
    }

    pub fn accepts_text(&self) -> bool {
        self.text_input.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationCategory {
    pub id: String,
    pub actions: Vec<NotificationAction>,
}

impl NotificationCategory {
    pub fn action(&self, id: &str) -> Option<&NotificationAction> {
        self.actions.iter().find(|action| action.id == id)
    }
}

/// The fixed set of categories registered once at startup.
pub fn default_categories() -> Vec<NotificationCategory> {
    vec![
        NotificationCategory {
            id: TASK_COMPLETION_CATEGORY.to_string(),
            actions: vec![
                NotificationAction::foreground(VIEW_TASK_ACTION, "View Task"),
                NotificationAction::background(RETRY_TASK_ACTION, "Retry Task"),
            ],
        },
        NotificationCategory {
            id: MESSAGE_CATEGORY.to_string(),
            actions: vec![NotificationAction::text_input(
                REPLY_ACTION,
                "Reply",
                "Send",
                "Type a reply...",
            )],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_category_launches_view_in_foreground_and_retries_in_background() {
        let categories = default_categories();
        let task = categories
            .iter()
            .find(|category| category.id == TASK_COMPLETION_CATEGORY)
            .expect("task category");
        let ids: Vec<&str> = task.actions.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec![VIEW_TASK_ACTION, RETRY_TASK_ACTION]);
        assert!(task.action(VIEW_TASK_ACTION).unwrap().options.foreground);
        assert!(!task.action(RETRY_TASK_ACTION).unwrap().options.foreground);
    }

    #[test]
    fn message_category_offers_inline_reply() {
        let categories = default_categories();
        let reply = categories
            .iter()
            .find(|category| category.id == MESSAGE_CATEGORY)
            .and_then(|category| category.action(REPLY_ACTION))
            .expect("reply action");
        assert!(reply.accepts_text());
        let input = reply.text_input.as_ref().unwrap();
        assert_eq!(input.button_title, "Send");
        assert_eq!(input.placeholder, "Type a reply...");
    }
}
