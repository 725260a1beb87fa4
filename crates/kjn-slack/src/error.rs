//! Error types for the Slack client.

use thiserror::Error;

/// Errors returned by the Slack Web API client.
#[derive(Debug, Error)]
pub enum SlackError {
    /// The request could not be sent or the response could not be read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack answered with `ok: false`.
    #[error("{method} failed: {code}")]
    Api {
        /// The Web API method that was called.
        method: &'static str,
        /// The `error` code Slack returned.
        code: String,
    },

    /// The upload endpoint rejected the file content.
    #[error("{method} returned HTTP {status}")]
    Status {
        /// The step that failed.
        method: &'static str,
        /// The HTTP status code.
        status: u16,
    },

    /// Slack answered `ok: true` without the data the call needs.
    #[error("{method} returned an unexpected response: {reason}")]
    UnexpectedResponse {
        /// The Web API method that was called.
        method: &'static str,
        /// What was missing.
        reason: String,
    },
}

impl SlackError {
    /// Returns the Slack error code, if Slack returned one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}
