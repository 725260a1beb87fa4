//! The chat backend seam and its payload types.
//!
//! [`ChatApi`] is the two-call surface the notifier needs from Slack:
//! posting a message and uploading a file. [`SlackClient`](crate::SlackClient)
//! is the production implementation.

use std::future::Future;

use kjn_core::JobEvent;
use serde::{Deserialize, Serialize};

use crate::error::SlackError;

/// Attachment colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Color {
    /// Rendered green.
    #[serde(rename = "good")]
    Normal,
    /// Rendered yellow.
    #[serde(rename = "warning")]
    Warning,
    /// Rendered red.
    #[serde(rename = "danger")]
    Danger,
}

impl Color {
    /// Returns the Slack colour token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "good",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

/// A coloured, titled message attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// Side-bar colour.
    pub color: Color,
    /// Bold title line.
    pub title: String,
    /// Body text.
    pub text: String,
}

impl Attachment {
    /// Creates an attachment styled for a lifecycle event.
    #[must_use]
    pub fn for_event(event: JobEvent, text: impl Into<String>) -> Self {
        let (color, title) = match event {
            JobEvent::Started => (Color::Normal, "Job Start"),
            JobEvent::Succeeded => (Color::Normal, "Job Success"),
            JobEvent::Failed => (Color::Danger, "Job Failed"),
        };
        Self {
            color,
            title: title.to_string(),
            text: text.into(),
        }
    }
}

/// Body of a `chat.postMessage` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Channel name or ID.
    pub channel: String,
    /// Top-level text. Empty when everything is in the attachments.
    pub text: String,
    /// Attachments rendered below the text.
    pub attachments: Vec<Attachment>,
    /// Display username override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Where a posted message landed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostedMessage {
    /// Channel ID.
    #[serde(default)]
    pub channel: String,
    /// Message timestamp.
    #[serde(default)]
    pub ts: String,
}

/// A text file to share in a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Channel to share the file in, by name (`#jobs`) or ID.
    pub channel: String,
    /// File title shown in Slack.
    pub title: String,
    /// File name, also used as the upload file name.
    pub filename: String,
    /// Raw content.
    pub content: String,
    /// Slack snippet type, for example `text`.
    pub filetype: String,
}

/// Metadata of an uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
    /// File ID.
    #[serde(default)]
    pub id: String,
    /// File name.
    #[serde(default)]
    pub name: String,
    /// File title.
    #[serde(default)]
    pub title: String,
    /// Permanent link to the file.
    #[serde(default)]
    pub permalink: String,
}

/// Chat backend operations used by the notifier.
#[allow(async_fn_in_trait)]
pub trait ChatApi: Send + Sync {
    /// Posts a message.
    fn post_message(
        &self,
        message: &ChatMessage,
    ) -> impl Future<Output = Result<PostedMessage, SlackError>> + Send;

    /// Uploads a file and shares it in the upload's channel.
    fn upload_file(
        &self,
        upload: &FileUpload,
    ) -> impl Future<Output = Result<UploadedFile, SlackError>> + Send;
}
