use async_trait::async_trait;

use crate::{
    category::NotificationCategory,
    error::PlatformError,
    model::{AuthorizationState, NotificationRequest},
};

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Presentation options requested when prompting for permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationOptions {
    pub alert: bool,
    pub sound: bool,
    pub badge: bool,
}

impl Default for AuthorizationOptions {
    fn default() -> Self {
        Self {
            alert: true,
            sound: true,
            badge: true,
        }
    }
}

/// Platform-specific notification adapters implement this trait.
///
/// Adding a request whose identifier is already pending or delivered replaces
/// the earlier request.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    async fn request_authorization(&self, options: AuthorizationOptions) -> PlatformResult<bool>;

    async fn authorization_status(&self) -> PlatformResult<AuthorizationState>;

    /// Asks the OS to register for remote pushes; the token arrives later through
    /// the authorization gate.
    async fn register_for_remote_notifications(&self) -> PlatformResult<()>;

    async fn add(&self, request: NotificationRequest) -> PlatformResult<()>;

    async fn remove_pending(&self, identifiers: &[String]) -> PlatformResult<()>;

    async fn remove_delivered(&self, identifiers: &[String]) -> PlatformResult<()>;

    async fn remove_all_pending(&self) -> PlatformResult<()>;

    async fn remove_all_delivered(&self) -> PlatformResult<()>;

    async fn pending(&self) -> PlatformResult<Vec<NotificationRequest>>;

    async fn delivered(&self) -> PlatformResult<Vec<NotificationRequest>>;

    async fn set_badge_count(&self, count: u32) -> PlatformResult<()>;

    async fn set_categories(&self, categories: Vec<NotificationCategory>) -> PlatformResult<()>;
}
