use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{
    authorization::AuthorizationGate,
    collaborators::{DeviceRegistrar, MessageSender, TaskRetrier, Unwired, IOS_PLATFORM_TAG},
    dispatcher::NotificationDispatcher,
    error::{NotifyError, Result},
    events::{EventBus, RoutedEvent, DEFAULT_EVENT_CAPACITY},
    model::AuthorizationState,
    platform::NotificationPlatform,
    router::ResponseRouter,
};

/// Owns the authorization gate, dispatcher and response router for one app
/// process. Constructed at the composition root and handed to consumers.
pub struct NotificationService {
    gate: Arc<AuthorizationGate>,
    dispatcher: Arc<NotificationDispatcher>,
    router: Arc<ResponseRouter>,
    bus: EventBus,
}

pub struct NotificationServiceBuilder {
    platform: Option<Arc<dyn NotificationPlatform>>,
    registrar: Option<Arc<dyn DeviceRegistrar>>,
    retrier: Option<Arc<dyn TaskRetrier>>,
    sender: Option<Arc<dyn MessageSender>>,
    event_capacity: usize,
    platform_tag: String,
}

impl Default for NotificationServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationServiceBuilder {
    pub fn new() -> Self {
        Self {
            platform: None,
            registrar: None,
            retrier: None,
            sender: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            platform_tag: IOS_PLATFORM_TAG.to_string(),
        }
    }

    pub fn with_platform(mut self, platform: Arc<dyn NotificationPlatform>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_registrar(mut self, registrar: Arc<dyn DeviceRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn with_task_retrier(mut self, retrier: Arc<dyn TaskRetrier>) -> Self {
        self.retrier = Some(retrier);
        self
    }

    pub fn with_message_sender(mut self, sender: Arc<dyn MessageSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn with_platform_tag(mut self, tag: impl Into<String>) -> Self {
        self.platform_tag = tag.into();
        self
    }

    pub fn build(self) -> Result<NotificationService> {
        let platform = self.platform.ok_or(NotifyError::MissingPlatform)?;
        let registrar = self
            .registrar
            .unwrap_or_else(|| Arc::new(Unwired) as Arc<dyn DeviceRegistrar>);
        let retrier = self
            .retrier
            .unwrap_or_else(|| Arc::new(Unwired) as Arc<dyn TaskRetrier>);
        let sender = self
            .sender
            .unwrap_or_else(|| Arc::new(Unwired) as Arc<dyn MessageSender>);

        let bus = EventBus::new(self.event_capacity);
        Ok(NotificationService {
            gate: Arc::new(AuthorizationGate::new(
                Arc::clone(&platform),
                registrar,
                self.platform_tag,
            )),
            dispatcher: Arc::new(NotificationDispatcher::new(platform)),
            router: Arc::new(ResponseRouter::new(bus.clone(), retrier, sender)),
            bus,
        })
    }
}

impl NotificationService {
    pub fn builder() -> NotificationServiceBuilder {
        NotificationServiceBuilder::new()
    }

    /// Startup sequence: categories first, so the dispatcher accepts requests,
    /// then the current permission status.
    pub async fn start(&self) -> Result<AuthorizationState> {
        self.dispatcher.register_categories().await?;
        Ok(self.gate.refresh_status().await)
    }

    pub fn gate(&self) -> Arc<AuthorizationGate> {
        Arc::clone(&self.gate)
    }

    pub fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn router(&self) -> Arc<ResponseRouter> {
        Arc::clone(&self.router)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoutedEvent> {
        self.bus.subscribe()
    }
}
