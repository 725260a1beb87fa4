//! Slack notifications for Kubernetes Job lifecycle events.
//!
//! [`ChatNotifier`] turns a [`MessageTemplateParam`](kjn_core::MessageTemplateParam)
//! into a coloured Slack attachment and posts it to the channel configured
//! for the outcome. Success and failure notifications carrying a log upload
//! it first and link it from the message.
//!
//! # Example
//!
//! ```rust,no_run
//! use kjn_core::MessageTemplateParam;
//! use kjn_slack::{ChatNotifier, NotificationConfig};
//!
//! # async fn run() -> kjn_core::Result<()> {
//! let config = NotificationConfig::new("xoxb-...", "#jobs")?
//!     .with_failure_channel("#alerts")
//!     .with_username("job-bot");
//! let notifier = ChatNotifier::slack(config)?;
//!
//! let param = MessageTemplateParam::new("etl-job", "data").with_log("exit code 1");
//! notifier.notify_failed(param).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod notifier;

pub use api::{
    Attachment, ChatApi, ChatMessage, Color, FileUpload, PostedMessage, UploadedFile,
};
pub use client::SlackClient;
pub use config::{DEFAULT_API_URL, NotificationConfig};
pub use error::SlackError;
pub use notifier::ChatNotifier;
