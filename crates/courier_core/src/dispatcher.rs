use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::{
    category::{default_categories, NotificationCategory, MESSAGE_CATEGORY, TASK_COMPLETION_CATEGORY},
    error::{NotifyError, Result},
    model::{
        message_identifier, reminder_identifier, task_identifier, CalendarTrigger,
        NotificationRequest, NotificationSound, Payload, TaskStatus, KEY_CONVERSATION_ID,
        KEY_REMINDER_ID, KEY_STATUS, KEY_TASK_ID, KEY_TYPE, TYPE_MESSAGE, TYPE_REMINDER,
        TYPE_TASK_COMPLETION,
    },
    platform::NotificationPlatform,
};

#[derive(Debug, Default)]
struct DispatchState {
    categories_registered: bool,
}

/// Builds, schedules and cancels local notifications.
///
/// Every mutating call holds one lock across its platform round-trip, so
/// schedule, cancel and badge updates never interleave.
pub struct NotificationDispatcher {
    platform: Arc<dyn NotificationPlatform>,
    categories: Vec<NotificationCategory>,
    state: Mutex<DispatchState>,
}

impl NotificationDispatcher {
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        Self::with_categories(platform, default_categories())
    }

    pub fn with_categories(
        platform: Arc<dyn NotificationPlatform>,
        categories: Vec<NotificationCategory>,
    ) -> Self {
        Self {
            platform,
            categories,
            state: Mutex::new(DispatchState::default()),
        }
    }

    pub fn categories(&self) -> &[NotificationCategory] {
        &self.categories
    }

    pub async fn categories_registered(&self) -> bool {
        self.state.lock().await.categories_registered
    }

    /// Registers the category registry with the platform. Scheduling is refused
    /// until this has succeeded once.
    #[instrument(skip(self))]
    pub async fn register_categories(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.categories_registered {
            tracing::debug!("notification categories already registered");
            return Ok(());
        }
        self.platform
            .set_categories(self.categories.clone())
            .await?;
        state.categories_registered = true;
        tracing::info!(count = self.categories.len(), "notification categories registered");
        Ok(())
    }

    /// Enqueues a request, replacing any pending or delivered request that
    /// carries the same identifier. Platform failures are logged and dropped.
    #[instrument(skip(self, request), fields(identifier = %request.identifier))]
    pub async fn schedule(&self, request: NotificationRequest) -> Result<()> {
        if request.identifier.trim().is_empty() {
            return Err(NotifyError::EmptyIdentifier);
        }
        let state = self.state.lock().await;
        if !state.categories_registered {
            return Err(NotifyError::CategoriesNotRegistered {
                identifier: request.identifier,
            });
        }

        // `add` replaces a pending or delivered request with the same id. A
        // refused add leaves the earlier one untouched.
        let immediate = request.is_immediate();
        match self.platform.add(request).await {
            Ok(()) => tracing::debug!(immediate, "notification scheduled"),
            Err(err) => tracing::warn!(%err, "platform refused notification"),
        }
        drop(state);
        Ok(())
    }

    pub async fn schedule_immediate(
        &self,
        identifier: &str,
        title: &str,
        body: &str,
        payload: Payload,
        sound: NotificationSound,
    ) -> Result<()> {
        let request = NotificationRequest::new(identifier, title, body)
            .with_sound(sound)
            .with_payload(payload);
        self.schedule(request).await
    }

    /// One-shot delivery at the wall-clock minute of `delivery_time`.
    pub async fn schedule_at<Tz: TimeZone>(
        &self,
        identifier: &str,
        title: &str,
        body: &str,
        payload: Payload,
        delivery_time: &DateTime<Tz>,
    ) -> Result<()> {
        let trigger = CalendarTrigger::from_datetime(delivery_time);
        let request = NotificationRequest::new(identifier, title, body)
            .with_trigger(trigger)
            .with_payload(payload);
        self.schedule(request).await
    }

    /// Maps a finished task onto a notification. Statuses other than succeeded
    /// or failed schedule nothing and return `None`.
    pub async fn schedule_task_completion(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Option<NotificationRequest>> {
        let (title, body, sound) = match &status {
            TaskStatus::Succeeded => (
                "Task complete",
                format!("Task {task_id} finished successfully."),
                NotificationSound::Normal,
            ),
            TaskStatus::Failed => (
                "Task failed",
                format!("Task {task_id} did not finish. Retry it from here."),
                NotificationSound::Critical,
            ),
            TaskStatus::Other(raw) => {
                tracing::debug!(task_id, status = %raw, "no notification for task status");
                return Ok(None);
            }
        };

        let mut payload = Payload::new();
        payload.insert(KEY_TYPE.into(), TYPE_TASK_COMPLETION.into());
        payload.insert(KEY_TASK_ID.into(), task_id.into());
        payload.insert(KEY_STATUS.into(), status.as_str().into());

        let request = NotificationRequest::new(task_identifier(task_id), title, body)
            .with_sound(sound)
            .with_category(TASK_COMPLETION_CATEGORY)
            .with_payload(payload);
        self.schedule(request.clone()).await?;
        Ok(Some(request))
    }

    pub async fn schedule_reminder<Tz: TimeZone>(
        &self,
        reminder_id: &str,
        title: &str,
        body: &str,
        at: &DateTime<Tz>,
    ) -> Result<()> {
        let mut payload = Payload::new();
        payload.insert(KEY_TYPE.into(), TYPE_REMINDER.into());
        payload.insert(KEY_REMINDER_ID.into(), reminder_id.into());
        self.schedule_at(&reminder_identifier(reminder_id), title, body, payload, at)
            .await
    }

    /// Incoming chat message. One notification per conversation, newest wins.
    pub async fn schedule_message(
        &self,
        conversation_id: &str,
        sender: &str,
        preview: &str,
    ) -> Result<NotificationRequest> {
        let mut payload = Payload::new();
        payload.insert(KEY_TYPE.into(), TYPE_MESSAGE.into());
        payload.insert(KEY_CONVERSATION_ID.into(), conversation_id.into());

        let request = NotificationRequest::new(message_identifier(conversation_id), sender, preview)
            .with_category(MESSAGE_CATEGORY)
            .with_thread(conversation_id)
            .with_payload(payload);
        self.schedule(request.clone()).await?;
        Ok(request)
    }

    /// Removes pending and delivered notifications with `identifier`. Unknown
    /// identifiers are ignored.
    #[instrument(skip(self))]
    pub async fn cancel(&self, identifier: &str) {
        let _state = self.state.lock().await;
        let identifiers = [identifier.to_string()];
        if let Err(err) = self.platform.remove_pending(&identifiers).await {
            tracing::warn!(%err, "unable to remove pending notification");
        }
        if let Err(err) = self.platform.remove_delivered(&identifiers).await {
            tracing::warn!(%err, "unable to remove delivered notification");
        }
    }

    pub async fn clear_task_notifications(&self, task_id: &str) {
        self.cancel(&task_identifier(task_id)).await;
    }

    #[instrument(skip(self))]
    pub async fn cancel_all(&self) {
        let _state = self.state.lock().await;
        if let Err(err) = self.platform.remove_all_pending().await {
            tracing::warn!(%err, "unable to clear pending notifications");
        }
        if let Err(err) = self.platform.remove_all_delivered().await {
            tracing::warn!(%err, "unable to clear delivered notifications");
        }
    }

    #[instrument(skip(self))]
    pub async fn set_badge_count(&self, count: u32) {
        let _state = self.state.lock().await;
        if let Err(err) = self.platform.set_badge_count(count).await {
            tracing::warn!(%err, count, "badge update failed");
        }
    }

    pub async fn pending_requests(&self) -> Vec<NotificationRequest> {
        self.platform.pending().await.unwrap_or_else(|err| {
            tracing::warn!(%err, "unable to list pending notifications");
            Vec::new()
        })
    }

    pub async fn delivered_requests(&self) -> Vec<NotificationRequest> {
        self.platform.delivered().await.unwrap_or_else(|err| {
            tracing::warn!(%err, "unable to list delivered notifications");
            Vec::new()
        })
    }
}
