//! Chat notification configuration.

use std::fmt;

use kjn_core::{JobEvent, NotifyError, Result};

/// Default Slack Web API base URL.
pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// Process-wide chat configuration, loaded once at start-up.
#[derive(Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    token: String,
    default_channel: String,
    success_channel: Option<String>,
    failure_channel: Option<String>,
    username: Option<String>,
    api_url: String,
}

impl NotificationConfig {
    /// Creates a configuration posting to `default_channel`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` if the token is empty.
    pub fn new(token: impl Into<String>, default_channel: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(NotifyError::configuration("slack token must be set"));
        }

        Ok(Self {
            token,
            default_channel: default_channel.into(),
            success_channel: None,
            failure_channel: None,
            username: None,
            api_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Sets the channel used for start and success notifications.
    ///
    /// An empty value leaves the default channel in effect.
    #[must_use]
    pub fn with_success_channel(mut self, channel: impl Into<String>) -> Self {
        self.success_channel = non_empty(channel.into());
        self
    }

    /// Sets the channel used for failure notifications.
    ///
    /// An empty value leaves the default channel in effect.
    #[must_use]
    pub fn with_failure_channel(mut self, channel: impl Into<String>) -> Self {
        self.failure_channel = non_empty(channel.into());
        self
    }

    /// Sets the display username of posted messages.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = non_empty(username.into());
        self
    }

    /// Overrides the Web API base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the default channel.
    #[must_use]
    pub fn default_channel(&self) -> &str {
        &self.default_channel
    }

    /// Returns the display username, if set.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns the Web API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Resolves the channel a notification for `event` goes to.
    ///
    /// Start and success share the success override; failure has its own.
    #[must_use]
    pub fn channel_for(&self, event: JobEvent) -> &str {
        let override_channel = match event {
            JobEvent::Started | JobEvent::Succeeded => self.success_channel.as_deref(),
            JobEvent::Failed => self.failure_channel.as_deref(),
        };
        override_channel.unwrap_or(&self.default_channel)
    }
}

impl fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("token", &"<redacted>")
            .field("default_channel", &self.default_channel)
            .field("success_channel", &self.success_channel)
            .field("failure_channel", &self.failure_channel)
            .field("username", &self.username)
            .field("api_url", &self.api_url)
            .finish()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
