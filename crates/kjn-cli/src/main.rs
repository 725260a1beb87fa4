//! kube-job-notifier binary entrypoint.

use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use kjn_cli::{Cli, JobNotifier, LogFormat};
use kjn_slack::ChatNotifier;
use kjn_statsd::MetricsNotifier;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "notification failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let chat = ChatNotifier::slack(cli.slack.to_config()?)?;
    let metrics = cli
        .metrics
        .to_config()
        .map(|config| MetricsNotifier::statsd(&config))
        .transpose()?;
    let notifier = JobNotifier::new(chat, metrics);

    let log = match cli.command.log_source() {
        Some(source) => Some(
            source
                .read()
                .await
                .with_context(|| format!("reading job log from {source:?}"))?,
        ),
        None => None,
    };

    notifier
        .handle(cli.command.event(), &cli.command.job(), log)
        .await?;
    Ok(())
}
