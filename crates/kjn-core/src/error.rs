//! Error types for the notification pipeline.

use thiserror::Error;

/// Errors raised while producing a job notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Required configuration is missing or malformed. Fatal at start-up.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The message could not be rendered.
    #[error("template error: {reason}")]
    Template {
        /// The reason rendering failed.
        reason: String,
    },

    /// The job log could not be uploaded.
    #[error("log upload failed: {reason}")]
    Upload {
        /// The reason the upload failed.
        reason: String,
    },

    /// A chat message or service check could not be delivered.
    #[error("delivery failed: {reason}")]
    Delivery {
        /// The reason delivery failed.
        reason: String,
    },
}

impl NotifyError {
    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates an upload error.
    pub fn upload(reason: impl Into<String>) -> Self {
        Self::Upload {
            reason: reason.into(),
        }
    }

    /// Creates a delivery error.
    pub fn delivery(reason: impl Into<String>) -> Self {
        Self::Delivery {
            reason: reason.into(),
        }
    }

    /// Returns true if the process cannot continue after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<std::fmt::Error> for NotifyError {
    fn from(err: std::fmt::Error) -> Self {
        Self::Template {
            reason: err.to_string(),
        }
    }
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
