pub mod authorization;
pub mod category;
pub mod collaborators;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod memory;
pub mod model;
pub mod platform;
pub mod router;
pub mod service;

pub use crate::error::{NotifyError, PlatformError};
pub use crate::service::{NotificationService, NotificationServiceBuilder};
