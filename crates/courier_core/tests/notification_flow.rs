use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use courier_core::{
    category::{DEFAULT_ACTION, RETRY_TASK_ACTION},
    collaborators::{DeviceRegistrar, DeviceRegistration, TaskRetrier},
    events::RoutedEvent,
    memory::InMemoryPlatform,
    model::{AuthorizationState, NotificationResponse, TaskStatus},
    NotificationService,
};

#[derive(Default)]
struct Backend {
    registrations: Mutex<Vec<DeviceRegistration>>,
    retried: Mutex<Vec<String>>,
}

#[async_trait]
impl DeviceRegistrar for Backend {
    async fn register_device(&self, registration: DeviceRegistration) -> Result<()> {
        self.registrations.lock().push(registration);
        Ok(())
    }
}

#[async_trait]
impl TaskRetrier for Backend {
    async fn retry_task(&self, task_id: &str) -> Result<()> {
        self.retried.lock().push(task_id.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn task_notification_round_trip() {
    let platform = Arc::new(InMemoryPlatform::new().with_permission(true));
    let backend = Arc::new(Backend::default());
    let service = NotificationService::builder()
        .with_platform(platform.clone())
        .with_registrar(backend.clone())
        .with_task_retrier(backend.clone())
        .build()
        .expect("build notification service");
    let mut navigation = service.subscribe();

    let status = service.start().await.expect("startup");
    assert_eq!(status, AuthorizationState::NotDetermined);

    let gate = service.gate();
    assert!(gate.request_authorization().await);
    assert_eq!(platform.remote_registrations(), 1);
    assert_eq!(gate.handle_device_token(&[0x1, 0xFF]), "01ff");

    let dispatcher = service.dispatcher();
    let request = dispatcher
        .schedule_task_completion("7", TaskStatus::Failed)
        .await
        .expect("schedule")
        .expect("failed tasks notify");

    let now = NaiveDate::from_ymd_opt(2030, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(platform.deliver_due(now), vec!["task-7".to_string()]);

    let router = service.router();
    router
        .handle_response(NotificationResponse::new(
            RETRY_TASK_ACTION,
            request.payload.clone(),
        ))
        .await;
    assert_eq!(*backend.retried.lock(), vec!["7".to_string()]);

    let emitted = router
        .handle_response(NotificationResponse::new(DEFAULT_ACTION, request.payload))
        .await;
    assert_eq!(emitted, Some(RoutedEvent::task("7")));
    let event = tokio::time::timeout(Duration::from_secs(1), navigation.recv())
        .await
        .expect("event within timeout")
        .expect("navigation event");
    assert_eq!(event.signal_name(), "navigateToTask");
    assert_eq!(event.target_id, "7");

    dispatcher.clear_task_notifications("7").await;
    assert!(platform.entries_for("task-7").is_empty());

    for _ in 0..10 {
        if !backend.registrations.lock().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }
    let registrations = backend.registrations.lock().clone();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].token, "01ff");
    assert_eq!(registrations[0].platform, "ios");
}

#[tokio::test]
async fn cold_launch_cannot_schedule_before_startup() {
    let platform = Arc::new(InMemoryPlatform::new());
    let service = NotificationService::builder()
        .with_platform(platform.clone())
        .build()
        .expect("build notification service");

    let early = service
        .dispatcher()
        .schedule_task_completion("1", TaskStatus::Succeeded)
        .await;
    assert!(early.is_err());
    assert!(platform.pending_identifiers().is_empty());

    service.start().await.expect("startup");
    let scheduled = service
        .dispatcher()
        .schedule_task_completion("1", TaskStatus::Succeeded)
        .await
        .expect("schedule after startup");
    assert!(scheduled.is_some());
    assert_eq!(platform.pending_identifiers(), vec!["task-1".to_string()]);
}
