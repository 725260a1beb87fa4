//! DogStatsD service checks and their wire encoding.
//!
//! A service check is one datagram:
//!
//! ```text
//! _sc|<name>|<status>|h:<hostname>|#<tag>,<tag>|m:<message>
//! ```
//!
//! The message is always the last field.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsdError};

/// Status of a service check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCheckStatus {
    /// Healthy.
    Ok,
    /// Degraded.
    Warning,
    /// Down.
    Critical,
    /// Not determinable.
    Unknown,
}

impl ServiceCheckStatus {
    /// Returns the numeric wire code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceCheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single service check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCheck {
    /// Check name, for example `kube_job_notifier.job.status`.
    pub name: String,
    /// Reported status.
    pub status: ServiceCheckStatus,
    /// Free-form message.
    pub message: String,
    /// Reporting host.
    pub hostname: String,
    /// `key:value` tags.
    pub tags: Vec<String>,
}

impl ServiceCheck {
    /// Creates a check with no message, hostname or tags.
    #[must_use]
    pub fn new(name: impl Into<String>, status: ServiceCheckStatus) -> Self {
        Self {
            name: name.into(),
            status,
            message: String::new(),
            hostname: String::new(),
            tags: Vec::new(),
        }
    }

    /// Sets the message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the hostname.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Adds a `key:value` tag.
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push(format!("{key}:{value}"));
        self
    }

    /// Encodes the check as a datagram.
    ///
    /// `prefix` is prepended to the name and `extra_tags` are appended after
    /// the check's own tags.
    ///
    /// # Errors
    ///
    /// Returns `StatsdError::InvalidName` if the prefixed name is empty or
    /// contains `|` or a newline.
    pub fn encode(&self, prefix: &str, extra_tags: &[String]) -> Result<String> {
        let name = format!("{prefix}{}", self.name);
        validate_name(&name)?;

        let mut out = format!("_sc|{name}|{}", self.status.code());
        if !self.hostname.is_empty() {
            out.push_str("|h:");
            out.push_str(&sanitize(&self.hostname));
        }

        let tags: Vec<String> = self
            .tags
            .iter()
            .chain(extra_tags)
            .filter(|t| !t.is_empty())
            .map(|t| sanitize(t).replace(',', "_"))
            .collect();
        if !tags.is_empty() {
            out.push_str("|#");
            out.push_str(&tags.join(","));
        }

        if !self.message.is_empty() {
            out.push_str("|m:");
            out.push_str(&escape_message(&self.message));
        }
        Ok(out)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StatsdError::InvalidName {
            reason: "name cannot be empty".to_string(),
        });
    }
    if name.contains(['|', '\n']) {
        return Err(StatsdError::InvalidName {
            reason: format!("'{name}' contains a reserved character"),
        });
    }
    Ok(())
}

/// Field separators would split the datagram.
fn sanitize(value: &str) -> String {
    value.replace(['|', '\n'], "_")
}

fn escape_message(message: &str) -> String {
    message.replace('\n', "\\n").replace("m:", "m\\:")
}
