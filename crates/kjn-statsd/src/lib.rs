//! DogStatsD service checks for Kubernetes Job outcomes.
//!
//! [`MetricsNotifier`] reports every finished job as the service check
//! `kube_job_notifier.job.status`: `OK` for success, `CRITICAL` for failure,
//! tagged with the normalised job name and namespace.
//!
//! By default the client writes to the agent's Unix socket at
//! `/var/run/datadog/dsd.socket`; UDP agents are addressed as `udp://host:port`.
//!
//! # Example
//!
//! ```rust,no_run
//! use kjn_core::JobInfo;
//! use kjn_statsd::{MetricsConfig, MetricsNotifier};
//!
//! # fn run() -> kjn_core::Result<()> {
//! let config = MetricsConfig::default().with_tags("env:prod").with_namespace("batch");
//! let metrics = MetricsNotifier::statsd(&config)?;
//! metrics.fail_event(&JobInfo::new("etl-job-27x9k", "data"))?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod check;
pub mod client;
pub mod error;
pub mod notifier;

pub use check::{ServiceCheck, ServiceCheckStatus};
pub use client::{DEFAULT_ADDRESS, ServiceCheckSink, StatsdAddress, StatsdClient};
pub use error::StatsdError;
pub use notifier::{HOSTNAME, MetricsConfig, MetricsNotifier, SERVICE_CHECK_NAME, parse_tags};
