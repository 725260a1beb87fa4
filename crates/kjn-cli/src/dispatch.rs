//! Fan-out of one lifecycle event to chat and metrics.

use kjn_core::{JobEvent, JobInfo, MessageTemplateParam, Result};
use kjn_slack::{ChatApi, ChatNotifier, SlackClient};
use kjn_statsd::{MetricsNotifier, ServiceCheckSink, StatsdClient};
use tracing::{info, warn};

/// Sends every notification a job lifecycle event calls for.
///
/// Start events only go to chat. Success and failure go to chat and, when
/// configured, to the metrics backend. Both backends are attempted once; the
/// first error is returned.
#[derive(Debug)]
pub struct JobNotifier<A = SlackClient, S = StatsdClient> {
    chat: ChatNotifier<A>,
    metrics: Option<MetricsNotifier<S>>,
}

impl<A: ChatApi, S: ServiceCheckSink> JobNotifier<A, S> {
    /// Creates a notifier. `metrics` may be `None` to report to chat only.
    #[must_use]
    pub const fn new(chat: ChatNotifier<A>, metrics: Option<MetricsNotifier<S>>) -> Self {
        Self { chat, metrics }
    }

    /// Reports `event` for `job`, attaching `log` to terminal outcomes.
    pub async fn handle(&self, event: JobEvent, job: &JobInfo, log: Option<String>) -> Result<()> {
        info!(job = %job, event = %event, "notifying");
        let param = MessageTemplateParam::from(job).with_log(log.unwrap_or_default());

        let chat = match event {
            JobEvent::Started => self.chat.notify_start(param).await,
            JobEvent::Succeeded => self.chat.notify_success(param).await,
            JobEvent::Failed => self.chat.notify_failed(param).await,
        };

        let metrics = match (&self.metrics, event) {
            (Some(metrics), JobEvent::Succeeded) => metrics.success_event(job),
            (Some(metrics), JobEvent::Failed) => metrics.fail_event(job),
            _ => Ok(()),
        };

        if chat.is_err() && metrics.is_err() {
            warn!(job = %job, "both chat and metrics notifications failed");
        }
        chat.and(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kjn_core::NotifyError;
    use kjn_slack::{
        ChatMessage, FileUpload, NotificationConfig, PostedMessage, SlackError, UploadedFile,
    };
    use kjn_statsd::{ServiceCheck, StatsdError};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct Journal {
        entries: Mutex<Vec<String>>,
    }

    impl Journal {
        fn push(&self, entry: impl Into<String>) {
            self.entries.lock().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.entries.lock().clone()
        }
    }

    #[derive(Debug)]
    struct FakeChat {
        journal: Arc<Journal>,
        fail: bool,
    }

    impl ChatApi for FakeChat {
        async fn post_message(
            &self,
            message: &ChatMessage,
        ) -> std::result::Result<PostedMessage, SlackError> {
            self.journal.push(format!("post:{}", message.attachments[0].title));
            if self.fail {
                return Err(SlackError::Api {
                    method: "chat.postMessage",
                    code: "invalid_auth".to_string(),
                });
            }
            Ok(PostedMessage::default())
        }

        async fn upload_file(
            &self,
            upload: &FileUpload,
        ) -> std::result::Result<UploadedFile, SlackError> {
            self.journal.push(format!("upload:{}", upload.title));
            Ok(UploadedFile {
                permalink: "https://acme.slack.com/files/F1".to_string(),
                ..UploadedFile::default()
            })
        }
    }

    #[derive(Debug)]
    struct FakeSink {
        journal: Arc<Journal>,
        fail: bool,
    }

    impl ServiceCheckSink for FakeSink {
        fn service_check(&self, check: &ServiceCheck) -> kjn_statsd::error::Result<()> {
            self.journal.push(format!("check:{}", check.status));
            if self.fail {
                return Err(StatsdError::Io(std::io::Error::other("agent down")));
            }
            Ok(())
        }
    }

    fn notifier(
        chat_fails: bool,
        metrics_fail: bool,
    ) -> (JobNotifier<FakeChat, FakeSink>, Arc<Journal>) {
        let journal = Arc::new(Journal::default());
        let config = NotificationConfig::new("xoxb-test", "#jobs").expect("valid config");
        let chat = ChatNotifier::new(
            FakeChat {
                journal: Arc::clone(&journal),
                fail: chat_fails,
            },
            config,
        );
        let metrics = MetricsNotifier::new(FakeSink {
            journal: Arc::clone(&journal),
            fail: metrics_fail,
        });
        (JobNotifier::new(chat, Some(metrics)), journal)
    }

    fn job() -> JobInfo {
        JobInfo::new("etl-job-27x9k", "data")
    }

    #[tokio::test]
    async fn start_goes_to_chat_only() {
        let (notifier, journal) = notifier(false, false);
        assert!(notifier.handle(JobEvent::Started, &job(), None).await.is_ok());
        assert_eq!(journal.entries(), vec!["post:Job Start"]);
    }

    #[tokio::test]
    async fn success_with_log_uploads_posts_and_checks() {
        let (notifier, journal) = notifier(false, false);
        let result = notifier
            .handle(JobEvent::Succeeded, &job(), Some("ok".to_string()))
            .await;
        assert!(result.is_ok());
        assert_eq!(
            journal.entries(),
            vec!["upload:data_etl-job", "post:Job Success", "check:ok"]
        );
    }

    #[tokio::test]
    async fn failure_reports_critical() {
        let (notifier, journal) = notifier(false, false);
        assert!(notifier.handle(JobEvent::Failed, &job(), None).await.is_ok());
        assert_eq!(journal.entries(), vec!["post:Job Failed", "check:critical"]);
    }

    #[tokio::test]
    async fn chat_failure_still_sends_check() {
        let (notifier, journal) = notifier(true, false);
        let result = notifier.handle(JobEvent::Failed, &job(), None).await;
        assert!(matches!(result, Err(NotifyError::Delivery { .. })));
        assert_eq!(journal.entries(), vec!["post:Job Failed", "check:critical"]);
    }

    #[tokio::test]
    async fn metrics_failure_is_returned() {
        let (notifier, _) = notifier(false, true);
        let result = notifier.handle(JobEvent::Succeeded, &job(), None).await;
        match result {
            Err(NotifyError::Delivery { reason }) => assert!(reason.contains("agent down")),
            other => panic!("expected delivery error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn metrics_disabled() {
        let journal = Arc::new(Journal::default());
        let config = NotificationConfig::new("xoxb-test", "#jobs").expect("valid config");
        let chat = ChatNotifier::new(
            FakeChat {
                journal: Arc::clone(&journal),
                fail: false,
            },
            config,
        );
        let notifier: JobNotifier<FakeChat, FakeSink> = JobNotifier::new(chat, None);
        assert!(notifier.handle(JobEvent::Failed, &job(), None).await.is_ok());
        assert_eq!(journal.entries(), vec!["post:Job Failed"]);
    }
}
