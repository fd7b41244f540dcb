use thiserror::Error;

/// Failure reported by a notification platform backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("notification permission was denied")]
    PermissionDenied,

    #[error("platform rejected notification `{identifier}`: {reason}")]
    Rejected { identifier: String, reason: String },

    #[error("unable to update badge count: {0}")]
    Badge(String),

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    /// Scheduling was attempted before the category registry reached the platform.
    #[error("notification categories must be registered before scheduling `{identifier}`")]
    CategoriesNotRegistered { identifier: String },

    #[error("notification identifier must not be empty")]
    EmptyIdentifier,

    #[error("notification service is missing a platform backend")]
    MissingPlatform,

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

pub type Result<T, E = NotifyError> = std::result::Result<T, E>;
