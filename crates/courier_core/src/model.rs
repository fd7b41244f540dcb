use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

pub const KEY_TYPE: &str = "type";
pub const KEY_TASK_ID: &str = "taskId";
pub const KEY_STATUS: &str = "status";
pub const KEY_CONVERSATION_ID: &str = "conversationId";
pub const KEY_REMINDER_ID: &str = "reminderId";

pub const TYPE_TASK_COMPLETION: &str = "taskCompletion";
pub const TYPE_MESSAGE: &str = "message";
pub const TYPE_REMINDER: &str = "reminder";

/// Platform-reported permission level for presenting notifications.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationState {
    #[default]
    NotDetermined,
    Denied,
    Authorized,
    Provisional,
}

impl AuthorizationState {
    pub fn allows_delivery(self) -> bool {
        matches!(
            self,
            AuthorizationState::Authorized | AuthorizationState::Provisional
        )
    }
}

/// A single primitive stored in a notification payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PayloadValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PayloadValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadValue::Bool(value) => write!(f, "{value}"),
            PayloadValue::Integer(value) => write!(f, "{value}"),
            PayloadValue::Float(value) => write!(f, "{value}"),
            PayloadValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::Text(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::Text(value)
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Integer(value)
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        PayloadValue::Bool(value)
    }
}

/// Flat key-value userdata attached to a notification and handed back on response.
pub type Payload = BTreeMap<String, PayloadValue>;

pub fn payload_str<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(PayloadValue::as_str)
}

/// Reads an identifier that may have been stored as text or as an integer.
pub fn payload_id(payload: &Payload, key: &str) -> Option<String> {
    match payload.get(key)? {
        PayloadValue::Text(value) if !value.is_empty() => Some(value.clone()),
        PayloadValue::Integer(value) => Some(value.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum NotificationSound {
    #[default]
    Normal,
    Critical,
}

/// One-shot delivery time expressed as wall-clock calendar components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarTrigger {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl CalendarTrigger {
    pub fn from_datetime<Tz: TimeZone>(when: &DateTime<Tz>) -> Self {
        let local = when.naive_local();
        Self {
            year: local.year(),
            month: local.month(),
            day: local.day(),
            hour: local.hour(),
            minute: local.minute(),
        }
    }

    /// `None` when the components do not form a valid date.
    pub fn fire_time(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_opt(
            self.hour,
            self.minute,
            0,
        )
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.fire_time().map(|at| at <= now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub identifier: String,
    pub title: String,
    pub body: String,
    pub sound: NotificationSound,
    /// `None` delivers as soon as the platform allows.
    pub trigger: Option<CalendarTrigger>,
    pub category: Option<String>,
    pub thread_id: Option<String>,
    pub payload: Payload,
}

impl NotificationRequest {
    pub fn new(
        identifier: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            body: body.into(),
            sound: NotificationSound::Normal,
            trigger: None,
            category: None,
            thread_id: None,
            payload: Payload::new(),
        }
    }

    pub fn with_sound(mut self, sound: NotificationSound) -> Self {
        self.sound = sound;
        self
    }

    pub fn with_trigger(mut self, trigger: CalendarTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn is_immediate(&self) -> bool {
        self.trigger.is_none()
    }
}

/// Outcome of a background task as reported by the task service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "succeeded" => TaskStatus::Succeeded,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn task_identifier(task_id: &str) -> String {
    format!("task-{task_id}")
}

pub fn reminder_identifier(reminder_id: &str) -> String {
    format!("reminder-{reminder_id}")
}

pub fn message_identifier(conversation_id: &str) -> String {
    format!("message-{conversation_id}")
}

/// What the platform reports after the user interacts with a delivered notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub action_id: String,
    pub payload: Payload,
    pub user_text: Option<String>,
}

impl NotificationResponse {
    pub fn new(action_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            action_id: action_id.into(),
            payload,
            user_text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.user_text = Some(text.into());
        self
    }
}
