//! Error types for the kjn-statsd crate.

use kjn_core::NotifyError;
use thiserror::Error;

/// Errors that can occur while emitting to DogStatsD.
#[derive(Debug, Error)]
pub enum StatsdError {
    /// The agent address could not be parsed or resolved.
    #[error("invalid statsd address '{address}': {reason}")]
    InvalidAddress {
        /// The address as configured.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A service check name that cannot be encoded.
    #[error("invalid service check name: {reason}")]
    InvalidName {
        /// Why the name was rejected.
        reason: String,
    },

    /// The datagram could not be written to the socket.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StatsdError> for NotifyError {
    fn from(err: StatsdError) -> Self {
        match err {
            StatsdError::InvalidAddress { .. } => Self::configuration(err.to_string()),
            StatsdError::InvalidName { .. } | StatsdError::Io(_) => Self::delivery(err.to_string()),
        }
    }
}

/// Result type for statsd operations.
pub type Result<T> = std::result::Result<T, StatsdError>;
