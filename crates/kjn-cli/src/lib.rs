//! # kjn-cli
//!
//! Command-line front end of kube-job-notifier.
//!
//! One invocation reports one lifecycle event of one Job:
//!
//! ```text
//! kube-job-notifier start   --job etl-job-27x9k -n data
//! kube-job-notifier failed  --job etl-job-27x9k -n data --log-file /var/log/etl.log
//! ```
//!
//! [`JobNotifier`] fans the event out to Slack ([`kjn_slack`]) and, for
//! finished jobs, to DogStatsD ([`kjn_statsd`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod dispatch;

pub use cli::{Cli, Commands, JobArgs, LogFormat, LogSource, MetricsArgs, OutcomeArgs, SlackArgs};
pub use dispatch::JobNotifier;
