use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;

use crate::{
    category::NotificationCategory,
    error::PlatformError,
    model::{AuthorizationState, NotificationRequest},
    platform::{AuthorizationOptions, NotificationPlatform, PlatformResult},
};

#[derive(Debug)]
struct MemoryStore {
    pending: BTreeMap<String, NotificationRequest>,
    delivered: BTreeMap<String, NotificationRequest>,
    categories: Vec<NotificationCategory>,
    status: AuthorizationState,
    grant_on_request: bool,
    badge: u32,
    remote_registrations: usize,
    reject_adds: bool,
    reject_badge: bool,
}

/// Identifier-keyed notification store standing in for the OS notification center.
#[derive(Debug)]
pub struct InMemoryPlatform {
    store: Mutex<MemoryStore>,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(MemoryStore {
                pending: BTreeMap::new(),
                delivered: BTreeMap::new(),
                categories: Vec::new(),
                status: AuthorizationState::NotDetermined,
                grant_on_request: true,
                badge: 0,
                remote_registrations: 0,
                reject_adds: false,
                reject_badge: false,
            }),
        }
    }

    /// Decides what the simulated user answers to the permission prompt.
    pub fn with_permission(self, grant: bool) -> Self {
        self.store.lock().grant_on_request = grant;
        self
    }

    pub fn with_status(self, status: AuthorizationState) -> Self {
        self.store.lock().status = status;
        self
    }

    pub fn set_status(&self, status: AuthorizationState) {
        self.store.lock().status = status;
    }

    pub fn reject_adds(&self, reject: bool) {
        self.store.lock().reject_adds = reject;
    }

    pub fn reject_badge_updates(&self, reject: bool) {
        self.store.lock().reject_badge = reject;
    }

    pub fn badge_count(&self) -> u32 {
        self.store.lock().badge
    }

    pub fn registered_categories(&self) -> Vec<NotificationCategory> {
        self.store.lock().categories.clone()
    }

    pub fn remote_registrations(&self) -> usize {
        self.store.lock().remote_registrations
    }

    pub fn pending_identifiers(&self) -> Vec<String> {
        self.store.lock().pending.keys().cloned().collect()
    }

    pub fn delivered_identifiers(&self) -> Vec<String> {
        self.store.lock().delivered.keys().cloned().collect()
    }

    /// Every pending or delivered request carrying `identifier`.
    pub fn entries_for(&self, identifier: &str) -> Vec<NotificationRequest> {
        let store = self.store.lock();
        store
            .pending
            .get(identifier)
            .into_iter()
            .chain(store.delivered.get(identifier))
            .cloned()
            .collect()
    }

    /// Moves immediate requests and requests whose trigger has passed into the
    /// delivered set. Returns the identifiers that were delivered.
    pub fn deliver_due(&self, now: NaiveDateTime) -> Vec<String> {
        let mut store = self.store.lock();
        let due: Vec<String> = store
            .pending
            .iter()
            .filter(|(_, request)| match &request.trigger {
                None => true,
                Some(trigger) => trigger.is_due(now),
            })
            .map(|(identifier, _)| identifier.clone())
            .collect();
        for identifier in &due {
            if let Some(request) = store.pending.remove(identifier) {
                store.delivered.insert(identifier.clone(), request);
            }
        }
        due
    }
}

#[async_trait]
impl NotificationPlatform for InMemoryPlatform {
    async fn request_authorization(&self, _options: AuthorizationOptions) -> PlatformResult<bool> {
        let mut store = self.store.lock();
        match store.status {
            AuthorizationState::Denied => Err(PlatformError::PermissionDenied),
            AuthorizationState::Authorized | AuthorizationState::Provisional => Ok(true),
            AuthorizationState::NotDetermined => {
                store.status = if store.grant_on_request {
                    AuthorizationState::Authorized
                } else {
                    AuthorizationState::Denied
                };
                Ok(store.grant_on_request)
            }
        }
    }

    async fn authorization_status(&self) -> PlatformResult<AuthorizationState> {
        Ok(self.store.lock().status)
    }

    async fn register_for_remote_notifications(&self) -> PlatformResult<()> {
        self.store.lock().remote_registrations += 1;
        Ok(())
    }

    async fn add(&self, request: NotificationRequest) -> PlatformResult<()> {
        let mut store = self.store.lock();
        if store.reject_adds {
            return Err(PlatformError::Rejected {
                identifier: request.identifier,
                reason: "store rejected request".to_string(),
            });
        }
        store.delivered.remove(&request.identifier);
        store.pending.insert(request.identifier.clone(), request);
        Ok(())
    }

    async fn remove_pending(&self, identifiers: &[String]) -> PlatformResult<()> {
        let mut store = self.store.lock();
        for identifier in identifiers {
            store.pending.remove(identifier);
        }
        Ok(())
    }

    async fn remove_delivered(&self, identifiers: &[String]) -> PlatformResult<()> {
        let mut store = self.store.lock();
        for identifier in identifiers {
            store.delivered.remove(identifier);
        }
        Ok(())
    }

    async fn remove_all_pending(&self) -> PlatformResult<()> {
        self.store.lock().pending.clear();
        Ok(())
    }

    async fn remove_all_delivered(&self) -> PlatformResult<()> {
        self.store.lock().delivered.clear();
        Ok(())
    }

    async fn pending(&self) -> PlatformResult<Vec<NotificationRequest>> {
        Ok(self.store.lock().pending.values().cloned().collect())
    }

    async fn delivered(&self) -> PlatformResult<Vec<NotificationRequest>> {
        Ok(self.store.lock().delivered.values().cloned().collect())
    }

    async fn set_badge_count(&self, count: u32) -> PlatformResult<()> {
        let mut store = self.store.lock();
        if store.reject_badge {
            return Err(PlatformError::Badge("badge updates disabled".to_string()));
        }
        store.badge = count;
        Ok(())
    }

    async fn set_categories(&self, categories: Vec<NotificationCategory>) -> PlatformResult<()> {
        self.store.lock().categories = categories;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CalendarTrigger;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 7)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn adding_same_identifier_replaces_delivered_entry() {
        let platform = InMemoryPlatform::new();
        platform
            .add(NotificationRequest::new("task-1", "first", ""))
            .await
            .unwrap();
        platform.deliver_due(at(9, 0));
        platform
            .add(NotificationRequest::new("task-1", "second", ""))
            .await
            .unwrap();

        let entries = platform.entries_for("task-1");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "second");
        assert!(platform.delivered_identifiers().is_empty());
    }

    #[tokio::test]
    async fn deliver_due_respects_calendar_trigger() {
        let platform = InMemoryPlatform::new();
        let trigger = CalendarTrigger {
            year: 2025,
            month: 11,
            day: 7,
            hour: 10,
            minute: 0,
        };
        platform
            .add(NotificationRequest::new("reminder-a", "later", "").with_trigger(trigger))
            .await
            .unwrap();
        platform
            .add(NotificationRequest::new("task-2", "now", ""))
            .await
            .unwrap();

        assert_eq!(platform.deliver_due(at(9, 59)), vec!["task-2".to_string()]);
        assert_eq!(platform.pending_identifiers(), vec!["reminder-a".to_string()]);
        assert_eq!(
            platform.deliver_due(at(10, 0)),
            vec!["reminder-a".to_string()]
        );
    }

    #[tokio::test]
    async fn previously_denied_permission_is_a_platform_error() {
        let platform = InMemoryPlatform::new().with_status(AuthorizationState::Denied);
        let result = platform
            .request_authorization(AuthorizationOptions::default())
            .await;
        assert_eq!(result, Err(PlatformError::PermissionDenied));
    }
}
