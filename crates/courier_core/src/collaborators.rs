use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const IOS_PLATFORM_TAG: &str = "ios";

/// Body sent to the device-token registration endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceRegistration {
    pub token: String,
    pub platform: String,
}

#[async_trait]
pub trait DeviceRegistrar: Send + Sync {
    async fn register_device(&self, registration: DeviceRegistration) -> Result<()>;
}

#[async_trait]
pub trait TaskRetrier: Send + Sync {
    async fn retry_task(&self, task_id: &str) -> Result<()>;
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_reply(&self, conversation_id: &str, text: &str) -> Result<()>;
}

/// Stand-in used when the application wires no collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unwired;

#[async_trait]
impl DeviceRegistrar for Unwired {
    async fn register_device(&self, registration: DeviceRegistration) -> Result<()> {
        tracing::debug!(platform = %registration.platform, "no device registrar wired");
        Ok(())
    }
}

#[async_trait]
impl TaskRetrier for Unwired {
    async fn retry_task(&self, task_id: &str) -> Result<()> {
        tracing::debug!(task_id, "no task retrier wired");
        Ok(())
    }
}

#[async_trait]
impl MessageSender for Unwired {
    async fn send_reply(&self, conversation_id: &str, _text: &str) -> Result<()> {
        tracing::debug!(conversation_id, "no message sender wired");
        Ok(())
    }
}
