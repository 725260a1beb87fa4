//! Rendering of the human-readable notification body.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::job::JobInfo;

/// Input to [`render`], built fresh for every notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplateParam {
    /// Display name of the job.
    pub job_name: String,
    /// Namespace of the job. Omitted from the message when empty.
    #[serde(default)]
    pub namespace: String,
    /// Raw log content, or a link to it once uploaded. Omitted when empty.
    #[serde(default)]
    pub log: String,
}

impl MessageTemplateParam {
    /// Creates a parameter set without a log.
    #[must_use]
    pub fn new(job_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            namespace: namespace.into(),
            log: String::new(),
        }
    }

    /// Sets the log content.
    #[must_use]
    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    /// Returns true if a log is attached.
    #[must_use]
    pub fn has_log(&self) -> bool {
        !self.log.is_empty()
    }
}

impl From<&JobInfo> for MessageTemplateParam {
    fn from(job: &JobInfo) -> Self {
        Self::new(job.job_name(), job.namespace.clone())
    }
}

/// Renders the message body.
///
/// The `JobName` line is always present; `Namespace` and `Loglink` lines
/// follow, in that order, only when the corresponding field is non-empty.
///
/// # Errors
///
/// Returns `NotifyError::Template` if the text cannot be written.
pub fn render(param: &MessageTemplateParam) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "*JobName*: {}", param.job_name)?;
    if !param.namespace.is_empty() {
        writeln!(out, "*Namespace*: {}", param.namespace)?;
    }
    if param.has_log() {
        writeln!(out, "*Loglink*: {}", param.log)?;
    }
    Ok(out)
}
