//! Command-line argument parsing with clap.
//!
//! Every setting has an environment fallback so the binary can be driven
//! entirely from a pod spec.

use std::io;
use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use kjn_core::{JobEvent, JobInfo, NotifyError, Result};
use kjn_slack::{DEFAULT_API_URL, NotificationConfig};
use kjn_statsd::{DEFAULT_ADDRESS, MetricsConfig};
use tokio::io::AsyncReadExt;

/// Send Kubernetes Job lifecycle notifications to Slack and DogStatsD.
#[derive(Parser, Debug, Clone)]
#[command(name = "kube-job-notifier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Slack settings.
    #[command(flatten)]
    pub slack: SlackArgs,

    /// DogStatsD settings.
    #[command(flatten)]
    pub metrics: MetricsArgs,

    /// Log output format.
    #[arg(long, value_enum, env = "KJN_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Lifecycle event to report.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Slack connection and routing.
#[derive(Args, Debug, Clone)]
pub struct SlackArgs {
    /// Bot token used as bearer credential.
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Default channel.
    #[arg(long, env = "SLACK_CHANNEL", default_value = "")]
    pub slack_channel: String,

    /// Channel for start and success messages.
    #[arg(long, env = "SLACK_SUCCEED_CHANNEL", default_value = "")]
    pub slack_succeed_channel: String,

    /// Channel for failure messages.
    #[arg(long, env = "SLACK_FAILED_CHANNEL", default_value = "")]
    pub slack_failed_channel: String,

    /// Display username of posted messages.
    #[arg(long, env = "SLACK_USERNAME", default_value = "")]
    pub slack_username: String,

    /// Slack Web API base URL.
    #[arg(long, env = "SLACK_API_URL", default_value = DEFAULT_API_URL)]
    pub slack_api_url: String,
}

impl SlackArgs {
    /// Builds the chat configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` if no token is set.
    pub fn to_config(&self) -> Result<NotificationConfig> {
        let token = self
            .slack_token
            .clone()
            .ok_or_else(|| NotifyError::configuration("SLACK_TOKEN must be set"))?;

        Ok(NotificationConfig::new(token, self.slack_channel.clone())?
            .with_success_channel(self.slack_succeed_channel.clone())
            .with_failure_channel(self.slack_failed_channel.clone())
            .with_username(self.slack_username.clone())
            .with_api_url(self.slack_api_url.clone()))
    }
}

/// DogStatsD connection and tagging.
#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    /// Agent address: `unix:///path`, `udp://host:port` or `host:port`.
    #[arg(long, env = "DD_DOGSTATSD_URL", default_value = DEFAULT_ADDRESS)]
    pub dogstatsd_url: String,

    /// Tags added to every service check, separated by spaces or commas.
    #[arg(long, env = "DD_TAGS", default_value = "")]
    pub dd_tags: String,

    /// Prefix for the service check name.
    #[arg(long, env = "DD_NAMESPACE", default_value = "")]
    pub dd_namespace: String,

    /// Do not send service checks. The variable accepts `1`, `yes`, `on`
    /// and `true` as well as their negatives.
    #[arg(
        long,
        env = "KJN_DISABLE_METRICS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub disable_metrics: bool,
}

impl MetricsArgs {
    /// Builds the metrics configuration, or `None` when metrics are disabled.
    #[must_use]
    pub fn to_config(&self) -> Option<MetricsConfig> {
        if self.disable_metrics {
            return None;
        }
        Some(
            MetricsConfig::default()
                .with_address(self.dogstatsd_url.clone())
                .with_tags(&self.dd_tags)
                .with_namespace(self.dd_namespace.clone()),
        )
    }
}

/// Lifecycle subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Report that a job started.
    Start(JobArgs),

    /// Report that a job succeeded.
    Success(OutcomeArgs),

    /// Report that a job failed.
    Failed(OutcomeArgs),
}

impl Commands {
    /// Returns the lifecycle event this command reports.
    #[must_use]
    pub const fn event(&self) -> JobEvent {
        match self {
            Self::Start(_) => JobEvent::Started,
            Self::Success(_) => JobEvent::Succeeded,
            Self::Failed(_) => JobEvent::Failed,
        }
    }

    /// Returns the job being reported.
    #[must_use]
    pub fn job(&self) -> JobInfo {
        let args = match self {
            Self::Start(args) => args,
            Self::Success(args) | Self::Failed(args) => &args.job,
        };
        JobInfo::new(args.job.clone(), args.namespace.clone())
    }

    /// Returns where the job log comes from, if anywhere.
    #[must_use]
    pub fn log_source(&self) -> Option<LogSource> {
        match self {
            Self::Start(_) => None,
            Self::Success(args) | Self::Failed(args) => args.log_source(),
        }
    }
}

/// Identifies the job.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Job object name, including any generated suffix.
    #[arg(long, env = "JOB_NAME")]
    pub job: String,

    /// Namespace of the job.
    #[arg(short, long, env = "JOB_NAMESPACE", default_value = "")]
    pub namespace: String,
}

/// Identifies a finished job and its log.
#[derive(Args, Debug, Clone)]
pub struct OutcomeArgs {
    /// The job.
    #[command(flatten)]
    pub job: JobArgs,

    /// File holding the job log; `-` reads standard input.
    #[arg(long, conflicts_with = "log")]
    pub log_file: Option<PathBuf>,

    /// Job log given inline.
    #[arg(long)]
    pub log: Option<String>,
}

impl OutcomeArgs {
    fn log_source(&self) -> Option<LogSource> {
        if let Some(text) = &self.log {
            return Some(LogSource::Inline(text.clone()));
        }
        self.log_file.as_ref().map(|path| {
            if path.as_os_str() == "-" {
                LogSource::Stdin
            } else {
                LogSource::File(path.clone())
            }
        })
    }
}

/// Where to read the job log from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// Literal text.
    Inline(String),
    /// A file on disk.
    File(PathBuf),
    /// Standard input.
    Stdin,
}

impl LogSource {
    /// Reads the whole log.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file or stdin cannot be read.
    pub async fn read(&self) -> io::Result<String> {
        match self {
            Self::Inline(text) => Ok(text.clone()),
            Self::File(path) => tokio::fs::read_to_string(path).await,
            Self::Stdin => {
                let mut text = String::new();
                tokio::io::stdin().read_to_string(&mut text).await?;
                Ok(text)
            }
        }
    }
}
