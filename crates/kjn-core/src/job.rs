//! Kubernetes Job identity and lifecycle events.
//!
//! - [`JobInfo`]: the Job a notification is about
//! - [`JobEvent`]: the lifecycle transition being reported

use std::fmt;

use serde::{Deserialize, Serialize};

/// Characters the Kubernetes name generator draws random suffixes from.
///
/// Vowels and easily confused digits are excluded, so ordinary words rarely
/// match.
const GENERATED_SUFFIX_ALPHABET: &str = "bcdfghjklmnpqrstvwxz2456789";

/// Length of a `generateName` random suffix.
const GENERATED_SUFFIX_LEN: usize = 5;

/// Minimum length of the scheduled-time suffix a CronJob appends.
const SCHEDULED_SUFFIX_MIN_LEN: usize = 8;

/// Identifies a Kubernetes Job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobInfo {
    /// Full object name, including any generated suffix.
    pub name: String,
    /// Namespace the Job runs in. May be empty.
    pub namespace: String,
}

impl JobInfo {
    /// Creates a new job record.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Returns the job name with a trailing generated suffix removed.
    ///
    /// `etl-job-27x9k` becomes `etl-job` and `backup-28391760` becomes
    /// `backup`. Names without such a suffix are returned as-is.
    #[must_use]
    pub fn job_name(&self) -> &str {
        strip_generated_suffix(&self.name)
    }
}

impl fmt::Display for JobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

fn strip_generated_suffix(name: &str) -> &str {
    match name.rsplit_once('-') {
        Some((base, suffix)) if !base.is_empty() && is_generated_suffix(suffix) => base,
        _ => name,
    }
}

fn is_generated_suffix(suffix: &str) -> bool {
    let random = suffix.len() == GENERATED_SUFFIX_LEN
        && suffix.chars().all(|c| GENERATED_SUFFIX_ALPHABET.contains(c));
    let scheduled =
        suffix.len() >= SCHEDULED_SUFFIX_MIN_LEN && suffix.chars().all(|c| c.is_ascii_digit());
    random || scheduled
}

/// A lifecycle transition of a Job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobEvent {
    /// The Job's first pod started.
    Started,
    /// The Job completed successfully.
    Succeeded,
    /// The Job failed.
    Failed,
}

impl JobEvent {
    /// Returns the event as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "start",
            Self::Succeeded => "success",
            Self::Failed => "failed",
        }
    }

    /// Returns true for outcomes reported to the metrics backend.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
