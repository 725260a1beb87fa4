//! Slack Web API client.
//!
//! Messages go through `chat.postMessage`. Files use the external upload
//! flow: `files.getUploadURLExternal` reserves an upload URL, the content is
//! posted to it, and `files.completeUploadExternal` shares the file in the
//! channel and returns its metadata.
//!
//! `files.completeUploadExternal` only takes channel IDs. A channel given by
//! name is looked up with `conversations.list`, which needs the
//! `channels:read` (and `groups:read` for private channels) scope.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{ChatApi, ChatMessage, FileUpload, PostedMessage, UploadedFile};
use crate::config::DEFAULT_API_URL;
use crate::error::SlackError;

const POST_MESSAGE: &str = "chat.postMessage";
const GET_UPLOAD_URL: &str = "files.getUploadURLExternal";
const UPLOAD_CONTENT: &str = "file content upload";
const COMPLETE_UPLOAD: &str = "files.completeUploadExternal";
const LIST_CONVERSATIONS: &str = "conversations.list";
const CONVERSATIONS_PAGE_SIZE: &str = "200";

/// Every Web API response carries `ok` and, on failure, an `error` code.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

impl<T> Envelope<T> {
    fn into_result(self, method: &'static str) -> Result<T, SlackError> {
        if self.ok {
            Ok(self.body)
        } else {
            Err(SlackError::Api {
                method,
                code: self.error.unwrap_or_else(|| "unknown_error".to_string()),
            })
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UploadUrl {
    #[serde(default)]
    upload_url: String,
    #[serde(default)]
    file_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct CompletedUpload {
    #[serde(default)]
    files: Vec<UploadedFile>,
}

#[derive(Debug, Default, Deserialize)]
struct ConversationPage {
    #[serde(default)]
    channels: Vec<Conversation>,
    #[serde(default)]
    response_metadata: Option<PageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Conversation {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PageMetadata {
    #[serde(default)]
    next_cursor: String,
}

/// Returns true if `channel` is a public (`C`), private (`G`) or direct
/// message (`D`) conversation ID rather than a name.
fn is_conversation_id(channel: &str) -> bool {
    channel.len() >= 9
        && channel.starts_with(['C', 'G', 'D'])
        && channel
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Bearer-token authenticated Slack client.
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl SlackClient {
    /// Creates a client against the public Slack API.
    ///
    /// # Errors
    ///
    /// Returns `SlackError::Http` if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self, SlackError> {
        Self::with_base_url(token, DEFAULT_API_URL)
    }

    /// Creates a client against a custom API base URL.
    ///
    /// # Errors
    ///
    /// Returns `SlackError::Http` if the HTTP client cannot be built.
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, SlackError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("kube-job-notifier/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        method: &'static str,
    ) -> Result<T, SlackError> {
        let envelope: Envelope<T> = response.json().await?;
        envelope.into_result(method)
    }

    async fn reserve_upload(&self, upload: &FileUpload) -> Result<UploadUrl, SlackError> {
        let length = upload.content.len().to_string();
        let response = self
            .http
            .post(self.method_url(GET_UPLOAD_URL))
            .bearer_auth(&self.token)
            .form(&[
                ("filename", upload.filename.as_str()),
                ("length", length.as_str()),
                ("snippet_type", upload.filetype.as_str()),
            ])
            .send()
            .await?;

        let reserved: UploadUrl = Self::decode(response, GET_UPLOAD_URL).await?;
        if reserved.upload_url.is_empty() || reserved.file_id.is_empty() {
            return Err(SlackError::UnexpectedResponse {
                method: GET_UPLOAD_URL,
                reason: "missing upload_url or file_id".to_string(),
            });
        }
        Ok(reserved)
    }

    async fn send_content(&self, upload_url: &str, content: &str) -> Result<(), SlackError> {
        let response = self
            .http
            .post(upload_url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(content.to_owned())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackError::Status {
                method: UPLOAD_CONTENT,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Resolves a channel name such as `#jobs` to its conversation ID.
    /// IDs are returned unchanged.
    async fn resolve_channel_id(&self, channel: &str) -> Result<String, SlackError> {
        if is_conversation_id(channel) {
            return Ok(channel.to_string());
        }

        let name = channel.trim_start_matches('#');
        let mut cursor = String::new();
        loop {
            let response = self
                .http
                .post(self.method_url(LIST_CONVERSATIONS))
                .bearer_auth(&self.token)
                .form(&[
                    ("types", "public_channel,private_channel"),
                    ("exclude_archived", "true"),
                    ("limit", CONVERSATIONS_PAGE_SIZE),
                    ("cursor", cursor.as_str()),
                ])
                .send()
                .await?;

            let page: ConversationPage = Self::decode(response, LIST_CONVERSATIONS).await?;
            if let Some(found) = page.channels.into_iter().find(|c| c.name == name) {
                debug!(channel = %channel, id = %found.id, "resolved slack channel");
                return Ok(found.id);
            }

            cursor = page
                .response_metadata
                .map(|meta| meta.next_cursor)
                .unwrap_or_default();
            if cursor.is_empty() {
                return Err(SlackError::Api {
                    method: LIST_CONVERSATIONS,
                    code: "channel_not_found".to_string(),
                });
            }
        }
    }

    async fn complete_upload(
        &self,
        file_id: &str,
        channel_id: &str,
        upload: &FileUpload,
    ) -> Result<UploadedFile, SlackError> {
        let body = serde_json::json!({
            "files": [{ "id": file_id, "title": upload.title }],
            "channel_id": channel_id,
        });
        let response = self
            .http
            .post(self.method_url(COMPLETE_UPLOAD))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let completed: CompletedUpload = Self::decode(response, COMPLETE_UPLOAD).await?;
        completed
            .files
            .into_iter()
            .next()
            .ok_or_else(|| SlackError::UnexpectedResponse {
                method: COMPLETE_UPLOAD,
                reason: "no file metadata".to_string(),
            })
    }
}

impl ChatApi for SlackClient {
    async fn post_message(&self, message: &ChatMessage) -> Result<PostedMessage, SlackError> {
        debug!(
            channel = %message.channel,
            attachments = message.attachments.len(),
            "posting slack message"
        );
        let response = self
            .http
            .post(self.method_url(POST_MESSAGE))
            .bearer_auth(&self.token)
            .json(message)
            .send()
            .await?;

        Self::decode(response, POST_MESSAGE).await
    }

    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, SlackError> {
        debug!(
            channel = %upload.channel,
            filename = %upload.filename,
            bytes = upload.content.len(),
            filetype = %upload.filetype,
            "uploading file to slack"
        );
        let channel_id = self.resolve_channel_id(&upload.channel).await?;
        let reserved = self.reserve_upload(upload).await?;
        self.send_content(&reserved.upload_url, &upload.content).await?;
        self.complete_upload(&reserved.file_id, &channel_id, upload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use test_case::test_case;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn parse<T: DeserializeOwned>(json: &str) -> Envelope<T> {
        serde_json::from_str(json).expect("valid envelope")
    }

    #[test]
    fn envelope_ok_post_message() {
        let envelope: Envelope<PostedMessage> =
            parse(r#"{"ok":true,"channel":"C123","ts":"1700000000.000100","message":{}}"#);
        let posted = envelope.into_result(POST_MESSAGE).expect("ok response");
        assert_eq!(posted.channel, "C123");
        assert_eq!(posted.ts, "1700000000.000100");
    }

    #[test]
    fn envelope_error_maps_code() {
        let envelope: Envelope<PostedMessage> =
            parse(r#"{"ok":false,"error":"channel_not_found"}"#);
        let err = envelope.into_result(POST_MESSAGE).unwrap_err();
        assert_eq!(err.code(), Some("channel_not_found"));
        assert!(err.to_string().starts_with("chat.postMessage"));
    }

    #[test]
    fn envelope_error_without_code() {
        let envelope: Envelope<UploadUrl> = parse(r#"{"ok":false}"#);
        let err = envelope.into_result(GET_UPLOAD_URL).unwrap_err();
        assert_eq!(err.code(), Some("unknown_error"));
    }

    #[test]
    fn envelope_upload_url() {
        let envelope: Envelope<UploadUrl> = parse(
            r#"{"ok":true,"upload_url":"https://files.slack.com/upload/v1/abc","file_id":"F123"}"#,
        );
        let reserved = envelope.into_result(GET_UPLOAD_URL).expect("ok response");
        assert_eq!(reserved.upload_url, "https://files.slack.com/upload/v1/abc");
        assert_eq!(reserved.file_id, "F123");
    }

    #[test]
    fn envelope_completed_upload() {
        let envelope: Envelope<CompletedUpload> = parse(concat!(
            r#"{"ok":true,"files":[{"id":"F123","title":"data_etl-job","#,
            r#""name":"data_etl-job.txt","#,
            r#""permalink":"https://acme.slack.com/files/U1/F123/data_etl-job.txt"}]}"#,
        ));
        let completed = envelope.into_result(COMPLETE_UPLOAD).expect("ok response");
        assert_eq!(completed.files.len(), 1);
        assert_eq!(
            completed.files[0].permalink,
            "https://acme.slack.com/files/U1/F123/data_etl-job.txt"
        );
    }

    #[test]
    fn client_trims_base_url() {
        let client = SlackClient::with_base_url("xoxb-test", "http://127.0.0.1:9/api/")
            .expect("client builds");
        assert_eq!(client.base_url(), "http://127.0.0.1:9/api");
        assert_eq!(
            client.method_url(POST_MESSAGE),
            "http://127.0.0.1:9/api/chat.postMessage"
        );
    }

    #[test]
    fn default_client_targets_slack() {
        let client = SlackClient::new("xoxb-test").expect("client builds");
        assert_eq!(client.base_url(), DEFAULT_API_URL);
    }

    #[tokio::test]
    async fn post_message_transport_error() {
        // Nothing listens on the loopback discard port.
        let client = SlackClient::with_base_url("xoxb-test", "http://127.0.0.1:9/api")
            .expect("client builds");
        let message = ChatMessage {
            channel: "#jobs".to_string(),
            text: String::new(),
            attachments: Vec::new(),
            username: None,
        };
        let result = client.post_message(&message).await;
        assert!(matches!(result, Err(SlackError::Http(_))));
    }

    #[test_case("C0123JOBS", true ; "public channel id")]
    #[test_case("G0123PRIV", true ; "private channel id")]
    #[test_case("D0123DIRECT", true ; "direct message id")]
    #[test_case("#jobs", false ; "hash name")]
    #[test_case("jobs", false ; "bare name")]
    #[test_case("CRONJOBS", false ; "short uppercase name")]
    #[test_case("C0123jobs", false ; "lowercase")]
    fn conversation_id_detection(channel: &str, expected: bool) {
        assert_eq!(is_conversation_id(channel), expected);
    }

    #[derive(Debug, Clone)]
    struct Recorded {
        path: String,
        body: String,
    }

    type Route = fn(&str, &str, &str) -> String;

    async fn read_request(stream: &mut TcpStream) -> Recorded {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.expect("read request");
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        while buf.len() < header_end + length {
            let n = stream.read(&mut chunk).await.expect("read body");
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        Recorded {
            path: head.split_whitespace().nth(1).unwrap_or_default().to_string(),
            body: String::from_utf8_lossy(&buf[header_end..header_end + length]).to_string(),
        }
    }

    /// Answers each loopback connection with `route(path, body, base_url)`.
    async fn serve(route: Route) -> (String, Arc<Mutex<Vec<Recorded>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let base = format!("http://{}", listener.local_addr().expect("local addr"));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        let server_base = base.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                let body = route(&request.path, &request.body, &server_base);
                log.lock().push(request);
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (base, seen)
    }

    fn workspace(path: &str, body: &str, base: &str) -> String {
        match path {
            "/api/conversations.list" if body.contains("cursor=page2") => concat!(
                r#"{"ok":true,"channels":[{"id":"C0123JOBS","name":"jobs"}],"#,
                r#""response_metadata":{"next_cursor":""}}"#,
            )
            .to_string(),
            "/api/conversations.list" => concat!(
                r#"{"ok":true,"channels":[{"id":"C0999MISC","name":"random"}],"#,
                r#""response_metadata":{"next_cursor":"page2"}}"#,
            )
            .to_string(),
            "/api/files.getUploadURLExternal" => {
                format!(r#"{{"ok":true,"upload_url":"{base}/upload/F123","file_id":"F123"}}"#)
            }
            "/upload/F123" => "OK - 3".to_string(),
            "/api/files.completeUploadExternal" => concat!(
                r#"{"ok":true,"files":[{"id":"F123","name":"data_etl","title":"data_etl","#,
                r#""permalink":"https://acme.slack.com/files/U1/F123/data_etl"}]}"#,
            )
            .to_string(),
            _ => r#"{"ok":false,"error":"unknown_method"}"#.to_string(),
        }
    }

    fn log_upload(channel: &str) -> FileUpload {
        FileUpload {
            channel: channel.to_string(),
            title: "data_etl".to_string(),
            filename: "data_etl".to_string(),
            content: "log".to_string(),
            filetype: "text".to_string(),
        }
    }

    fn paths(seen: &Mutex<Vec<Recorded>>) -> Vec<String> {
        seen.lock().iter().map(|r| r.path.clone()).collect()
    }

    fn body_of(seen: &Mutex<Vec<Recorded>>, path: &str) -> String {
        seen.lock()
            .iter()
            .find(|r| r.path == path)
            .map(|r| r.body.clone())
            .expect("request recorded")
    }

    #[tokio::test]
    async fn upload_by_channel_name_resolves_id_and_sends_snippet_type() {
        let (base, seen) = serve(workspace).await;
        let client =
            SlackClient::with_base_url("xoxb-test", format!("{base}/api")).expect("client builds");

        let file = client.upload_file(&log_upload("#jobs")).await.expect("upload");
        assert_eq!(file.permalink, "https://acme.slack.com/files/U1/F123/data_etl");

        assert_eq!(
            paths(&seen),
            vec![
                "/api/conversations.list",
                "/api/conversations.list",
                "/api/files.getUploadURLExternal",
                "/upload/F123",
                "/api/files.completeUploadExternal",
            ]
        );

        let reserve = body_of(&seen, "/api/files.getUploadURLExternal");
        assert!(reserve.contains("filename=data_etl"), "{reserve}");
        assert!(reserve.contains("length=3"), "{reserve}");
        assert!(reserve.contains("snippet_type=text"), "{reserve}");

        assert_eq!(body_of(&seen, "/upload/F123"), "log");

        let complete = body_of(&seen, "/api/files.completeUploadExternal");
        assert!(complete.contains(r#""channel_id":"C0123JOBS""#), "{complete}");
    }

    #[tokio::test]
    async fn upload_by_channel_id_skips_lookup() {
        let (base, seen) = serve(workspace).await;
        let client =
            SlackClient::with_base_url("xoxb-test", format!("{base}/api")).expect("client builds");

        client.upload_file(&log_upload("C0123JOBS")).await.expect("upload");

        assert!(!paths(&seen).iter().any(|p| p == "/api/conversations.list"));
        let complete = body_of(&seen, "/api/files.completeUploadExternal");
        assert!(complete.contains(r#""channel_id":"C0123JOBS""#), "{complete}");
    }

    #[tokio::test]
    async fn unknown_channel_name_fails_before_upload() {
        let (base, seen) = serve(workspace).await;
        let client =
            SlackClient::with_base_url("xoxb-test", format!("{base}/api")).expect("client builds");

        let err = client.upload_file(&log_upload("#nope")).await.unwrap_err();
        assert_eq!(err.code(), Some("channel_not_found"));
        assert_eq!(
            paths(&seen),
            vec!["/api/conversations.list", "/api/conversations.list"]
        );
    }
}
