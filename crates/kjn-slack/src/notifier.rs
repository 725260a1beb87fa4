//! Chat notifications for job lifecycle events.

use kjn_core::{JobEvent, MessageTemplateParam, NotifyError, Result, render};
use tracing::{error, info};

use crate::api::{Attachment, ChatApi, ChatMessage, FileUpload, UploadedFile};
use crate::client::SlackClient;
use crate::config::NotificationConfig;

/// Slack file type of uploaded logs.
const LOG_FILETYPE: &str = "text";

/// Posts job lifecycle messages to chat.
///
/// Each call is one sequential chain: resolve channel, upload the log if the
/// outcome carries one, render, post. Nothing is retried and nothing is kept
/// between calls.
#[derive(Debug)]
pub struct ChatNotifier<A = SlackClient> {
    api: A,
    config: NotificationConfig,
}

impl ChatNotifier<SlackClient> {
    /// Creates a notifier backed by the Slack Web API.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Configuration` if the HTTP client cannot be built.
    pub fn slack(config: NotificationConfig) -> Result<Self> {
        let api = SlackClient::with_base_url(config.token(), config.api_url())
            .map_err(|e| NotifyError::configuration(format!("slack client: {e}")))?;
        Ok(Self::new(api, config))
    }
}

impl<A: ChatApi> ChatNotifier<A> {
    /// Creates a notifier over an arbitrary chat backend.
    #[must_use]
    pub const fn new(api: A, config: NotificationConfig) -> Self {
        Self { api, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &NotificationConfig {
        &self.config
    }

    /// Announces that a job started. Never uploads a log.
    pub async fn notify_start(&self, param: MessageTemplateParam) -> Result<()> {
        self.notify_event(JobEvent::Started, param).await
    }

    /// Announces that a job succeeded, uploading its log first if present.
    pub async fn notify_success(&self, param: MessageTemplateParam) -> Result<()> {
        self.notify_event(JobEvent::Succeeded, param).await
    }

    /// Announces that a job failed, uploading its log first if present.
    pub async fn notify_failed(&self, param: MessageTemplateParam) -> Result<()> {
        self.notify_event(JobEvent::Failed, param).await
    }

    /// Sends the notification for `event`.
    pub async fn notify_event(
        &self,
        event: JobEvent,
        mut param: MessageTemplateParam,
    ) -> Result<()> {
        let channel = self.config.channel_for(event);

        if event.is_terminal() && param.has_log() {
            let file = self.upload_log(channel, &param).await?;
            param.log = file.permalink;
        }

        let text = render(&param).inspect_err(|e| {
            error!(job = %param.job_name, error = %e, "failed to render message");
        })?;

        self.notify(channel, Attachment::for_event(event, text)).await
    }

    async fn notify(&self, channel: &str, attachment: Attachment) -> Result<()> {
        let message = ChatMessage {
            channel: channel.to_string(),
            text: String::new(),
            attachments: vec![attachment],
            username: self.config.username().map(str::to_string),
        };

        match self.api.post_message(&message).await {
            Ok(posted) => {
                info!(channel = %posted.channel, ts = %posted.ts, "message sent");
                Ok(())
            }
            Err(e) => {
                error!(channel = %channel, error = %e, "failed to send message");
                Err(NotifyError::delivery(e.to_string()))
            }
        }
    }

    async fn upload_log(
        &self,
        channel: &str,
        param: &MessageTemplateParam,
    ) -> Result<UploadedFile> {
        let title = format!("{}_{}", param.namespace, param.job_name);
        let upload = FileUpload {
            channel: channel.to_string(),
            filename: title.clone(),
            title,
            content: param.log.clone(),
            filetype: LOG_FILETYPE.to_string(),
        };

        match self.api.upload_file(&upload).await {
            Ok(file) => {
                info!(channel = %channel, file = %file.name, "log uploaded");
                Ok(file)
            }
            Err(e) => {
                error!(
                    channel = %channel,
                    file = %upload.title,
                    error = %e,
                    "failed to upload log"
                );
                Err(NotifyError::upload(e.to_string()))
            }
        }
    }
}
