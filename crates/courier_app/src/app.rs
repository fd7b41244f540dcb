use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Local};
use courier_core::{
    collaborators::{DeviceRegistrar, DeviceRegistration, MessageSender, TaskRetrier},
    events::RoutedEvent,
    memory::InMemoryPlatform,
    model::{NotificationResponse, NotificationSound, Payload, TaskStatus},
    NotificationService,
};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) event_capacity: usize,
    pub(crate) request_auth_on_start: bool,
    pub(crate) platform_tag: String,
    pub(crate) initial_badge: Option<u32>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Malformed values are ignored and keep the default.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(capacity) = lookup("COURIER_EVENT_CAPACITY") {
            if let Ok(value) = capacity.trim().parse::<usize>() {
                if value > 0 {
                    config.event_capacity = value;
                }
            }
        }
        if let Some(flag) = lookup("COURIER_REQUEST_AUTH_ON_START") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.request_auth_on_start = true,
                "0" | "false" | "no" => config.request_auth_on_start = false,
                other => debug!(value = other, "ignoring COURIER_REQUEST_AUTH_ON_START"),
            }
        }
        if let Some(tag) = lookup("COURIER_PLATFORM_TAG") {
            let tag = tag.trim();
            if !tag.is_empty() {
                config.platform_tag = tag.to_string();
            }
        }
        if let Some(badge) = lookup("COURIER_INITIAL_BADGE") {
            if let Ok(value) = badge.trim().parse::<u32>() {
                config.initial_badge = Some(value);
            }
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            event_capacity: 64,
            request_auth_on_start: true,
            platform_tag: "ios".to_string(),
            initial_badge: None,
        }
    }
}

/// Registration endpoint adapter. The HTTP client lives outside this shell, so
/// the request body is logged instead of sent.
struct LoggingRegistrar;

#[async_trait]
impl DeviceRegistrar for LoggingRegistrar {
    async fn register_device(&self, registration: DeviceRegistration) -> Result<()> {
        let body = serde_json::to_string(&registration).context("encode registration body")?;
        info!(%body, "device registration prepared");
        Ok(())
    }
}

struct LoggingTaskService;

#[async_trait]
impl TaskRetrier for LoggingTaskService {
    async fn retry_task(&self, task_id: &str) -> Result<()> {
        info!(task_id, "retry requested from notification");
        Ok(())
    }
}

#[async_trait]
impl MessageSender for LoggingTaskService {
    async fn send_reply(&self, conversation_id: &str, text: &str) -> Result<()> {
        info!(conversation_id, chars = text.chars().count(), "inline reply queued");
        Ok(())
    }
}

/// Routes the navigation layer has been asked to open, oldest first.
#[derive(Clone, Default)]
pub struct NavigationLog {
    routes: Arc<Mutex<Vec<RoutedEvent>>>,
}

impl NavigationLog {
    pub fn routes(&self) -> Vec<RoutedEvent> {
        self.routes.lock().clone()
    }

    fn record(&self, event: RoutedEvent) {
        self.routes.lock().push(event);
    }
}

fn spawn_navigation_listener(
    mut events: broadcast::Receiver<RoutedEvent>,
    log: NavigationLog,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    info!(signal = event.signal_name(), target_id = %event.target_id, "navigating");
                    log.record(event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "navigation listener fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// One line of input to the shell, standing in for platform callbacks and
/// app-side triggers.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AppCommand {
    RequestAuthorization,
    RefreshStatus,
    DeviceToken { bytes: Vec<u8> },
    RegistrationFailed { reason: String },
    TaskFinished { task_id: String, status: String },
    Reminder {
        reminder_id: String,
        title: String,
        body: String,
        minutes_from_now: i64,
    },
    Message {
        conversation_id: String,
        sender: String,
        preview: String,
    },
    Alert {
        identifier: String,
        title: String,
        body: String,
        #[serde(default)]
        critical: bool,
        #[serde(default)]
        payload: Payload,
    },
    Deliver,
    Respond {
        action_id: String,
        #[serde(default)]
        payload: Payload,
        text: Option<String>,
    },
    Cancel { identifier: String },
    CancelAll,
    Badge { count: u32 },
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct RegistrationError(String);

pub struct AppController {
    service: NotificationService,
    platform: Arc<InMemoryPlatform>,
    config: AppConfig,
    navigation: NavigationLog,
}

impl AppController {
    pub fn new(config: AppConfig) -> Result<Self> {
        info!(platform = %config.platform_tag, "initializing notification service");
        let platform = Arc::new(InMemoryPlatform::new());
        let tasks = Arc::new(LoggingTaskService);
        let service = NotificationService::builder()
            .with_platform(platform.clone())
            .with_registrar(Arc::new(LoggingRegistrar))
            .with_task_retrier(tasks.clone())
            .with_message_sender(tasks)
            .with_event_capacity(config.event_capacity)
            .with_platform_tag(config.platform_tag.clone())
            .build()
            .context("failed to initialize notification service")?;
        Ok(Self {
            service,
            platform,
            config,
            navigation: NavigationLog::default(),
        })
    }

    pub fn navigation(&self) -> NavigationLog {
        self.navigation.clone()
    }

    /// Runs the startup sequence and attaches the navigation listener.
    pub async fn initialize(&self) -> Result<JoinHandle<()>> {
        let listener = spawn_navigation_listener(self.service.subscribe(), self.navigation());
        let status = self
            .service
            .start()
            .await
            .context("notification startup failed")?;
        info!(?status, "notification service started");
        if self.config.request_auth_on_start && !status.allows_delivery() {
            let granted = self.service.gate().request_authorization().await;
            info!(granted, "startup permission prompt finished");
        }
        if let Some(count) = self.config.initial_badge {
            self.service.dispatcher().set_badge_count(count).await;
        }
        Ok(listener)
    }

    pub async fn apply(&self, command: AppCommand) -> Result<()> {
        let dispatcher = self.service.dispatcher();
        match command {
            AppCommand::RequestAuthorization => {
                self.service.gate().request_authorization().await;
            }
            AppCommand::RefreshStatus => {
                self.service.gate().refresh_status().await;
            }
            AppCommand::DeviceToken { bytes } => {
                self.service.gate().handle_device_token(&bytes);
            }
            AppCommand::RegistrationFailed { reason } => {
                self.service
                    .gate()
                    .handle_registration_failure(&RegistrationError(reason));
            }
            AppCommand::TaskFinished { task_id, status } => {
                dispatcher
                    .schedule_task_completion(&task_id, TaskStatus::from(status.as_str()))
                    .await?;
            }
            AppCommand::Reminder {
                reminder_id,
                title,
                body,
                minutes_from_now,
            } => {
                let at = Duration::try_minutes(minutes_from_now)
                    .and_then(|offset| Local::now().checked_add_signed(offset))
                    .ok_or_else(|| anyhow!("reminder offset of {minutes_from_now} minutes is out of range"))?;
                dispatcher
                    .schedule_reminder(&reminder_id, &title, &body, &at)
                    .await?;
            }
            AppCommand::Message {
                conversation_id,
                sender,
                preview,
            } => {
                dispatcher
                    .schedule_message(&conversation_id, &sender, &preview)
                    .await?;
            }
            AppCommand::Alert {
                identifier,
                title,
                body,
                critical,
                payload,
            } => {
                let sound = if critical {
                    NotificationSound::Critical
                } else {
                    NotificationSound::Normal
                };
                dispatcher
                    .schedule_immediate(&identifier, &title, &body, payload, sound)
                    .await?;
            }
            AppCommand::Deliver => {
                let delivered = self.platform.deliver_due(Local::now().naive_local());
                info!(count = delivered.len(), "notifications delivered");
                let total = dispatcher.delivered_requests().await.len();
                dispatcher
                    .set_badge_count(u32::try_from(total).unwrap_or(u32::MAX))
                    .await;
            }
            AppCommand::Respond {
                action_id,
                payload,
                text,
            } => {
                let mut response = NotificationResponse::new(action_id, payload);
                response.user_text = text;
                self.service.router().handle_response(response).await;
            }
            AppCommand::Cancel { identifier } => dispatcher.cancel(&identifier).await,
            AppCommand::CancelAll => dispatcher.cancel_all().await,
            AppCommand::Badge { count } => dispatcher.set_badge_count(count).await,
        }
        Ok(())
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    // Notification state is confined to one thread, like a UI main loop.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create runtime")?;
    runtime.block_on(async move {
        let controller = AppController::new(config)?;
        let listener = controller.initialize().await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("failed to read command")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<AppCommand>(line) {
                Ok(command) => {
                    if let Err(err) = controller.apply(command).await {
                        warn!(error = %err, "command failed");
                    }
                }
                Err(err) => warn!(%err, "unrecognized command"),
            }
            tokio::task::yield_now().await;
        }

        info!(routes = controller.navigation().routes().len(), "input closed, shutting down");
        listener.abort();
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use courier_core::category::{DEFAULT_ACTION, VIEW_TASK_ACTION};

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("COURIER_EVENT_CAPACITY", "8"),
            ("COURIER_REQUEST_AUTH_ON_START", "no"),
            ("COURIER_PLATFORM_TAG", "ipados"),
            ("COURIER_INITIAL_BADGE", "2"),
        ]));
        assert_eq!(config.event_capacity, 8);
        assert!(!config.request_auth_on_start);
        assert_eq!(config.platform_tag, "ipados");
        assert_eq!(config.initial_badge, Some(2));
    }

    #[test]
    fn malformed_config_keeps_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("COURIER_EVENT_CAPACITY", "0"),
            ("COURIER_REQUEST_AUTH_ON_START", "maybe"),
            ("COURIER_PLATFORM_TAG", "  "),
            ("COURIER_INITIAL_BADGE", "-1"),
        ]));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn commands_parse_from_json_lines() {
        let command: AppCommand =
            serde_json::from_str(r#"{"cmd":"taskFinished","taskId":"42","status":"failed"}"#)
                .unwrap();
        assert_eq!(
            command,
            AppCommand::TaskFinished {
                task_id: "42".into(),
                status: "failed".into(),
            }
        );

        let command: AppCommand = serde_json::from_str(
            r#"{"cmd":"respond","actionId":"DEFAULT","payload":{"type":"message","conversationId":"c1"}}"#,
        )
        .unwrap();
        assert!(matches!(command, AppCommand::Respond { text: None, .. }));
    }

    #[tokio::test]
    async fn startup_prompts_and_routes_taps_to_navigation() {
        let controller = AppController::new(AppConfig {
            initial_badge: Some(4),
            ..AppConfig::default()
        })
        .unwrap();
        let listener = controller.initialize().await.unwrap();
        assert_eq!(controller.platform.badge_count(), 4);
        assert_eq!(controller.platform.remote_registrations(), 1);

        controller
            .apply(AppCommand::TaskFinished {
                task_id: "42".into(),
                status: "succeeded".into(),
            })
            .await
            .unwrap();
        controller.apply(AppCommand::Deliver).await.unwrap();
        assert_eq!(controller.platform.delivered_identifiers(), vec!["task-42".to_string()]);
        assert_eq!(controller.platform.badge_count(), 1);

        let mut payload = Payload::new();
        payload.insert("type".into(), "taskCompletion".into());
        payload.insert("taskId".into(), "42".into());
        controller
            .apply(AppCommand::Respond {
                action_id: DEFAULT_ACTION.into(),
                payload: payload.clone(),
                text: None,
            })
            .await
            .unwrap();
        controller
            .apply(AppCommand::Respond {
                action_id: VIEW_TASK_ACTION.into(),
                payload,
                text: None,
            })
            .await
            .unwrap();

        for _ in 0..10 {
            if controller.navigation().routes().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            controller.navigation().routes(),
            vec![RoutedEvent::task("42"), RoutedEvent::task("42")]
        );
        listener.abort();
    }

    #[tokio::test]
    async fn cancel_all_clears_store() {
        let controller = AppController::new(AppConfig {
            request_auth_on_start: false,
            ..AppConfig::default()
        })
        .unwrap();
        let listener = controller.initialize().await.unwrap();
        assert_eq!(controller.platform.remote_registrations(), 0);

        controller
            .apply(AppCommand::Message {
                conversation_id: "c1".into(),
                sender: "Ada".into(),
                preview: "hello".into(),
            })
            .await
            .unwrap();
        controller
            .apply(AppCommand::Reminder {
                reminder_id: "r1".into(),
                title: "Stretch".into(),
                body: "Time to stand up".into(),
                minutes_from_now: 30,
            })
            .await
            .unwrap();
        assert_eq!(controller.platform.pending_identifiers().len(), 2);

        controller.apply(AppCommand::CancelAll).await.unwrap();
        assert!(controller.platform.pending_identifiers().is_empty());
        listener.abort();
    }

    #[tokio::test]
    async fn out_of_range_reminder_is_an_error() {
        let controller = AppController::new(AppConfig {
            request_auth_on_start: false,
            ..AppConfig::default()
        })
        .unwrap();
        let listener = controller.initialize().await.unwrap();

        let result = controller
            .apply(AppCommand::Reminder {
                reminder_id: "r1".into(),
                title: "Stretch".into(),
                body: "Time to stand up".into(),
                minutes_from_now: i64::MAX / 2,
            })
            .await;
        assert!(result.is_err());
        assert!(controller.platform.pending_identifiers().is_empty());
        listener.abort();
    }

    #[tokio::test]
    async fn registration_failure_is_logged_only() {
        let controller = AppController::new(AppConfig {
            request_auth_on_start: false,
            ..AppConfig::default()
        })
        .unwrap();
        let listener = controller.initialize().await.unwrap();
        let before = controller.service.gate().state();

        controller
            .apply(AppCommand::RegistrationFailed {
                reason: "no valid aps-environment entitlement".into(),
            })
            .await
            .unwrap();
        assert_eq!(controller.service.gate().state(), before);
        listener.abort();
    }
}
