//! Service checks for job outcomes.

use kjn_core::{JobInfo, Result};
use tracing::{error, info};

use crate::check::{ServiceCheck, ServiceCheckStatus};
use crate::client::{DEFAULT_ADDRESS, ServiceCheckSink, StatsdClient};

/// Name of the service check reported for every job outcome.
pub const SERVICE_CHECK_NAME: &str = "kube_job_notifier.job.status";

/// Hostname attached to every service check.
pub const HOSTNAME: &str = "kube-job-notifier";

/// Metrics backend configuration, loaded once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Agent address, see [`StatsdAddress::parse`](crate::StatsdAddress::parse).
    pub address: String,
    /// Tags added to every check.
    pub tags: Vec<String>,
    /// Prefix for the check name.
    pub namespace: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            tags: Vec::new(),
            namespace: String::new(),
        }
    }
}

impl MetricsConfig {
    /// Sets the agent address. An empty value keeps the default.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        let address = address.into();
        if !address.trim().is_empty() {
            self.address = address;
        }
        self
    }

    /// Sets global tags from a `DD_TAGS`-style list separated by spaces or commas.
    #[must_use]
    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = parse_tags(tags);
        self
    }

    /// Sets the check name prefix.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// Splits a tag list on whitespace and commas, dropping empties.
#[must_use]
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reports job outcomes as a binary service check.
#[derive(Debug)]
pub struct MetricsNotifier<S = StatsdClient> {
    sink: S,
}

impl MetricsNotifier<StatsdClient> {
    /// Connects to the agent described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` if the address is invalid, or
    /// `NotifyError::Delivery` if the socket cannot be created.
    pub fn statsd(config: &MetricsConfig) -> Result<Self> {
        let client = StatsdClient::new(&config.address)
            .inspect_err(|e| {
                error!(address = %config.address, error = %e, "failed to create statsd client");
            })?
            .with_namespace(&config.namespace)
            .with_tags(config.tags.clone());
        Ok(Self::new(client))
    }
}

impl<S: ServiceCheckSink> MetricsNotifier<S> {
    /// Creates a notifier over an arbitrary sink.
    #[must_use]
    pub const fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Reports a successful job.
    pub fn success_event(&self, job: &JobInfo) -> Result<()> {
        self.emit(job, ServiceCheckStatus::Ok, "Job succeed")
    }

    /// Reports a failed job.
    pub fn fail_event(&self, job: &JobInfo) -> Result<()> {
        self.emit(job, ServiceCheckStatus::Critical, "Job failed")
    }

    fn emit(&self, job: &JobInfo, status: ServiceCheckStatus, message: &str) -> Result<()> {
        let check = ServiceCheck::new(SERVICE_CHECK_NAME, status)
            .message(message)
            .hostname(HOSTNAME)
            .tag("job_name", job.job_name())
            .tag("namespace", &job.namespace);

        match self.sink.service_check(&check) {
            Ok(()) => {
                info!(job = %job.job_name(), status = %status, "service check sent");
                Ok(())
            }
            Err(e) => {
                error!(
                    job = %job.job_name(),
                    status = %status,
                    error = %e,
                    "failed to send service check"
                );
                Err(e.into())
            }
        }
    }
}
