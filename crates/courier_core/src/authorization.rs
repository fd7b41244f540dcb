use std::sync::Arc;

use parking_lot::RwLock;
use tracing::instrument;

use crate::{
    collaborators::{DeviceRegistrar, DeviceRegistration},
    error::PlatformError,
    model::AuthorizationState,
    platform::{AuthorizationOptions, NotificationPlatform},
};

/// Lowercase, zero-padded hex rendering of an opaque push token.
pub fn device_token_hex(token: &[u8]) -> String {
    hex::encode(token)
}

/// Tracks notification permission and forwards device tokens for remote push.
pub struct AuthorizationGate {
    platform: Arc<dyn NotificationPlatform>,
    registrar: Arc<dyn DeviceRegistrar>,
    platform_tag: String,
    options: AuthorizationOptions,
    state: RwLock<AuthorizationState>,
}

impl AuthorizationGate {
    pub fn new(
        platform: Arc<dyn NotificationPlatform>,
        registrar: Arc<dyn DeviceRegistrar>,
        platform_tag: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            registrar,
            platform_tag: platform_tag.into(),
            options: AuthorizationOptions::default(),
            state: RwLock::new(AuthorizationState::NotDetermined),
        }
    }

    pub fn state(&self) -> AuthorizationState {
        *self.state.read()
    }

    /// Prompts for alert, sound and badge permission. Platform failures are logged
    /// and reported as `false`.
    #[instrument(skip(self))]
    pub async fn request_authorization(&self) -> bool {
        match self.platform.request_authorization(self.options).await {
            Ok(granted) => {
                *self.state.write() = if granted {
                    AuthorizationState::Authorized
                } else {
                    AuthorizationState::Denied
                };
                tracing::info!(granted, "notification permission answered");
                if granted {
                    if let Err(err) = self.platform.register_for_remote_notifications().await {
                        tracing::warn!(%err, "unable to register for remote notifications");
                    }
                }
                self.refresh_status().await;
                granted
            }
            Err(err) => {
                if err == PlatformError::PermissionDenied {
                    *self.state.write() = AuthorizationState::Denied;
                }
                tracing::warn!(%err, "notification permission request failed");
                false
            }
        }
    }

    /// Re-reads the platform status. Concurrent refreshes resolve last-write-wins.
    #[instrument(skip(self))]
    pub async fn refresh_status(&self) -> AuthorizationState {
        match self.platform.authorization_status().await {
            Ok(status) => {
                *self.state.write() = status;
                tracing::debug!(?status, "authorization status refreshed");
                status
            }
            Err(err) => {
                tracing::warn!(%err, "unable to query authorization status");
                self.state()
            }
        }
    }

    /// Converts the token and hands it to the registrar without waiting for the
    /// outcome. Returns the hex form that was sent.
    pub fn handle_device_token(&self, token: &[u8]) -> String {
        let hex_token = device_token_hex(token);
        let registration = DeviceRegistration {
            token: hex_token.clone(),
            platform: self.platform_tag.clone(),
        };
        let registrar = Arc::clone(&self.registrar);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = registrar.register_device(registration).await {
                        tracing::warn!(error = %err, "device token registration failed");
                    }
                });
            }
            Err(err) => {
                tracing::warn!(%err, "no runtime available to register device token");
            }
        }
        tracing::info!(token_len = token.len(), "device token received");
        hex_token
    }

    pub fn handle_registration_failure(&self, error: &(dyn std::error::Error + 'static)) {
        tracing::warn!(%error, "remote notification registration failed");
    }
}
