//! Telegram Bot API binding.
//!
//! One client plays three roles: the catalog lives in a pinned channel
//! message (`DocumentSink`), page images are documents posted to the same
//! channel (`ObjectStore`), and alerts go to the administrator's private
//! chat (`AdminNotifier`).

use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::bot::event::Reply;
use crate::config::Settings;
use crate::notify::AdminNotifier;
use crate::objects::ObjectStore;
use crate::sink::{DocumentHandle, DocumentSink, PinnedDocument};

pub fn method_endpoint(api_base: &str, token: &str, method: &str) -> String {
    let api_base = api_base.trim_end_matches('/');
    format!("{api_base}/bot{token}/{method}")
}

pub fn file_endpoint(api_base: &str, token: &str, file_path: &str) -> String {
    let api_base = api_base.trim_end_matches('/');
    format!("{api_base}/file/bot{token}/{file_path}")
}

/// Channel message body for the catalog: the JSON inside a `<code>` block.
/// Telegram counts the text after entity parsing, so the wrapper and the
/// escapes do not count toward the message ceiling.
pub fn document_markup(json: &str) -> String {
    format!("<code>{}</code>", html_escape::encode_text(json))
}

/// `reply_markup` for an inline keyboard, or `None` when the reply has no buttons.
pub fn reply_markup(reply: &Reply) -> Option<serde_json::Value> {
    if reply.keyboard.is_empty() {
        return None;
    }
    let rows: Vec<Vec<serde_json::Value>> = reply
        .keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| {
                    serde_json::json!({
                        "text": button.label,
                        "callback_data": button.action.encode(),
                    })
                })
                .collect()
        })
        .collect();
    Some(serde_json::json!({ "inline_keyboard": rows }))
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub pinned_message: Option<Box<Message>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    #[serde(default)]
    file_path: Option<String>,
}

impl Message {
    /// File id of the largest photo size, or of an attached document.
    pub fn attachment_reference(&self) -> Option<&str> {
        let photo = self.photo.as_ref().and_then(|sizes| {
            sizes
                .iter()
                .max_by_key(|size| u64::from(size.width) * u64::from(size.height))
        });
        photo
            .map(|size| size.file_id.as_str())
            .or_else(|| self.document.as_ref().map(|doc| doc.file_id.as_str()))
    }
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    channel_id: String,
    admin_id: i64,
}

impl TelegramClient {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            api_base: settings.api_base.clone(),
            token: settings.bot_token.clone(),
            channel_id: settings.channel_id.clone(),
            admin_id: settings.admin_id,
        })
    }

    fn channel(&self) -> serde_json::Value {
        match self.channel_id.parse::<i64>() {
            Ok(id) => serde_json::json!(id),
            Err(_) => serde_json::json!(self.channel_id),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<T> {
        let request = self
            .http
            .post(method_endpoint(&self.api_base, &self.token, method))
            .json(body);
        self.send(method, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> anyhow::Result<T> {
        // Request errors carry the URL, which embeds the token.
        let response = request
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("POST {method}"))?;
        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("read {method} response body"))?;

        match serde_json::from_str::<ApiResponse<T>>(&raw) {
            Ok(ApiResponse {
                ok: true,
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            Ok(ApiResponse {
                description: Some(description),
                ..
            }) => anyhow::bail!("Telegram API error in {method} ({status}): {description}"),
            _ => anyhow::bail!("Telegram API error in {method} ({status}): {raw}"),
        }
    }

    /// Drops updates queued while the bot was offline.
    pub async fn drop_pending_updates(&self) -> anyhow::Result<()> {
        let _: bool = self
            .call(
                "deleteWebhook",
                &serde_json::json!({ "drop_pending_updates": true }),
            )
            .await?;
        Ok(())
    }

    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> anyhow::Result<Vec<Update>> {
        let mut body = serde_json::json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("offset".to_owned(), serde_json::json!(offset));
        }
        let request = self
            .http
            .post(method_endpoint(&self.api_base, &self.token, "getUpdates"))
            .timeout(Duration::from_secs(timeout_secs + 10))
            .json(&body);
        self.send("getUpdates", request).await
    }

    pub async fn send_reply(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()> {
        let mut body = serde_json::json!({ "chat_id": chat_id, "text": reply.text });
        if let Some(markup) = reply_markup(reply)
            && let Some(obj) = body.as_object_mut()
        {
            obj.insert("reply_markup".to_owned(), markup);
        }
        let _: serde_json::Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_id: &str) -> anyhow::Result<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &serde_json::json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }

    async fn file_path(&self, file_id: &str) -> anyhow::Result<String> {
        let file: RemoteFile = self
            .call("getFile", &serde_json::json!({ "file_id": file_id }))
            .await?;
        file.file_path
            .with_context(|| format!("file {file_id} has no download path"))
    }
}

#[async_trait]
impl DocumentSink for TelegramClient {
    async fn create_document(&self, text: &str) -> anyhow::Result<DocumentHandle> {
        let message: Message = self
            .call(
                "sendMessage",
                &serde_json::json!({
                    "chat_id": self.channel(),
                    "text": document_markup(text),
                    "parse_mode": "HTML",
                }),
            )
            .await?;
        Ok(DocumentHandle(message.message_id))
    }

    async fn update_document(&self, handle: DocumentHandle, text: &str) -> anyhow::Result<()> {
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &serde_json::json!({
                    "chat_id": self.channel(),
                    "message_id": handle.0,
                    "text": document_markup(text),
                    "parse_mode": "HTML",
                }),
            )
            .await?;
        Ok(())
    }

    async fn pin(&self, handle: DocumentHandle) -> anyhow::Result<()> {
        let _: bool = self
            .call(
                "pinChatMessage",
                &serde_json::json!({
                    "chat_id": self.channel(),
                    "message_id": handle.0,
                    "disable_notification": true,
                }),
            )
            .await?;
        Ok(())
    }

    async fn unpin(&self, handle: DocumentHandle) -> anyhow::Result<()> {
        let _: bool = self
            .call(
                "unpinChatMessage",
                &serde_json::json!({ "chat_id": self.channel(), "message_id": handle.0 }),
            )
            .await?;
        Ok(())
    }

    async fn delete_document(&self, handle: DocumentHandle) -> anyhow::Result<()> {
        let _: bool = self
            .call(
                "deleteMessage",
                &serde_json::json!({ "chat_id": self.channel(), "message_id": handle.0 }),
            )
            .await?;
        Ok(())
    }

    async fn get_pinned_document(&self) -> anyhow::Result<Option<PinnedDocument>> {
        let chat: Chat = self
            .call("getChat", &serde_json::json!({ "chat_id": self.channel() }))
            .await?;
        Ok(chat.pinned_message.map(|message| PinnedDocument {
            handle: DocumentHandle(message.message_id),
            text: message.text.unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl ObjectStore for TelegramClient {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        caption: &str,
    ) -> anyhow::Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_owned());
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.channel_id.clone())
            .text("caption", caption.to_owned())
            .part("document", part);
        let request = self
            .http
            .post(method_endpoint(&self.api_base, &self.token, "sendDocument"))
            .multipart(form);
        let message: Message = self.send("sendDocument", request).await?;
        message
            .attachment_reference()
            .map(str::to_owned)
            .with_context(|| format!("sendDocument returned no file id for {filename}"))
    }

    async fn download(&self, reference: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.file_path(reference).await?;
        let response = self
            .http
            .get(file_endpoint(&self.api_base, &self.token, &path))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("download file {reference}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("download file {reference} failed ({status})");
        }
        let bytes = response
            .bytes()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("read file {reference}"))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AdminNotifier for TelegramClient {
    async fn notify(&self, text: &str) -> anyhow::Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &serde_json::json!({ "chat_id": self.admin_id, "text": text }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::event::{Action, Button};

    #[test]
    fn endpoints_embed_token_and_trim_slashes() {
        assert_eq!(
            method_endpoint("https://api.telegram.org/", "123:abc", "getMe"),
            "https://api.telegram.org/bot123:abc/getMe"
        );
        assert_eq!(
            file_endpoint("http://127.0.0.1:1", "t", "documents/file_1.zip"),
            "http://127.0.0.1:1/file/bott/documents/file_1.zip"
        );
    }

    #[test]
    fn document_markup_escapes_html() {
        assert_eq!(
            document_markup(r#"{"title": "<Tom & Jerry>"}"#),
            r#"<code>{"title": "&lt;Tom &amp; Jerry&gt;"}</code>"#
        );
    }

    #[test]
    fn reply_markup_renders_rows() {
        assert_eq!(reply_markup(&Reply::text("plain")), None);

        let mut reply = Reply::text("menu").button("Help", Action::Help);
        reply.keyboard.push(vec![
            Button::new("A", Action::Select(4)),
            Button::new("B", Action::ConfirmDelete),
        ]);
        let markup = reply_markup(&reply).expect("keyboard markup");
        assert_eq!(
            markup,
            serde_json::json!({
                "inline_keyboard": [
                    [{ "text": "Help", "callback_data": "help" }],
                    [
                        { "text": "A", "callback_data": "select:4" },
                        { "text": "B", "callback_data": "confirm_delete" }
                    ]
                ]
            })
        );
    }

    #[test]
    fn attachment_reference_prefers_the_largest_photo() -> anyhow::Result<()> {
        let message: Message = serde_json::from_value(serde_json::json!({
            "message_id": 1,
            "chat": { "id": 5 },
            "photo": [
                { "file_id": "small", "width": 90, "height": 90 },
                { "file_id": "large", "width": 1280, "height": 1800 },
                { "file_id": "medium", "width": 320, "height": 450 }
            ]
        }))?;
        assert_eq!(message.attachment_reference(), Some("large"));

        let message: Message = serde_json::from_value(serde_json::json!({
            "message_id": 2,
            "chat": { "id": 5 },
            "document": { "file_id": "doc", "file_name": "page.png", "mime_type": "image/png" }
        }))?;
        assert_eq!(message.attachment_reference(), Some("doc"));
        Ok(())
    }
}
