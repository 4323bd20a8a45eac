//! Telegram Bot API adapter: long-poll update loop plus the outbound
//! `Transport` implementation.
//!
//! Only the handful of methods the bot needs are wired: `getUpdates`,
//! `sendMessage` (with optional inline keyboard), `sendVideo`,
//! `answerCallbackQuery` and `getFile` + file download.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use vidbrand_core::UserId;

use crate::service::BrandBot;
use crate::transport::{Choice, Transport, TransportError};

const API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 90;
const VIDEO_UPLOAD_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Message {
    pub from: Option<User>,
    pub text: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct User {
    pub id: UserId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    file_path: Option<String>,
}

/// What one update asks us to do, before any file download happens.
#[derive(Debug, PartialEq)]
pub(crate) enum PendingEvent {
    Text { user_id: UserId, text: String },
    Photo { user_id: UserId, file_id: String },
    Choice { user_id: UserId, callback_id: String, token: String },
}

/// Map a raw update to a pending event, dropping updates the bot does
/// not handle (edits, stickers, captions without photos, ...).
pub(crate) fn pending_event(update: &Update) -> Option<PendingEvent> {
    if let Some(query) = &update.callback_query {
        let token = query.data.clone()?;
        return Some(PendingEvent::Choice {
            user_id: query.from.id,
            callback_id: query.id.clone(),
            token,
        });
    }
    let message = update.message.as_ref()?;
    let user_id = message.from.as_ref()?.id;
    if let Some(photos) = &message.photo {
        // Telegram sends size variants smallest-first; take the largest.
        let file_id = photos.last()?.file_id.clone();
        return Some(PendingEvent::Photo { user_id, file_id });
    }
    let text = message.text.clone()?;
    Some(PendingEvent::Text { user_id, text })
}

/// Rows of two buttons, matching the four-corner prompt layout.
pub(crate) fn inline_keyboard(choices: &[Choice]) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = choices
        .chunks(2)
        .map(|row| {
            row.iter()
                .map(|c| json!({ "text": c.label, "callback_data": c.token }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

/// Shared low-level client for the Bot API.
pub struct TelegramApi {
    client: reqwest::Client,
    api_base: String,
    file_base: String,
}

impl TelegramApi {
    pub fn new(token: &str) -> Result<Arc<Self>, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Arc::new(Self {
            client,
            api_base: format!("{API_BASE}/bot{token}"),
            file_base: format!("{API_BASE}/file/bot{token}"),
        }))
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<R, TransportError> {
        let response = self
            .client
            .post(format!("{}/{}", self.api_base, method))
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError(format!("{method}: {e}")))?;
        let body: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| TransportError(format!("{method}: invalid response: {e}")))?;
        if !body.ok {
            return Err(TransportError(format!(
                "{method}: {}",
                body.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        body.result
            .ok_or_else(|| TransportError(format!("{method}: missing result")))
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        self.call(
            "getUpdates",
            &json!({ "offset": offset, "timeout": LONG_POLL_SECS }),
        )
        .await
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TransportError> {
        let _: bool = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": callback_id }))
            .await?;
        Ok(())
    }

    /// Resolve a file id and download its contents.
    async fn download_file(&self, file_id: &str) -> Result<Bytes, TransportError> {
        let file: TelegramFile = self.call("getFile", &json!({ "file_id": file_id })).await?;
        let path = file
            .file_path
            .ok_or_else(|| TransportError("getFile: no file_path".to_string()))?;
        let response = self
            .client
            .get(format!("{}/{}", self.file_base, path))
            .send()
            .await
            .map_err(|e| TransportError(format!("file download: {e}")))?;
        response
            .bytes()
            .await
            .map_err(|e| TransportError(format!("file download: {e}")))
    }
}

/// Outbound transport over the Bot API.
pub struct TelegramTransport {
    api: Arc<TelegramApi>,
}

impl TelegramTransport {
    pub fn new(api: Arc<TelegramApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, user_id: UserId, text: &str) -> Result<(), TransportError> {
        let _: serde_json::Value = self
            .api
            .call("sendMessage", &json!({ "chat_id": user_id, "text": text }))
            .await?;
        Ok(())
    }

    async fn send_video(&self, user_id: UserId, video: Bytes) -> Result<(), TransportError> {
        let part = reqwest::multipart::Part::bytes(video.to_vec())
            .file_name("branded.mp4")
            .mime_str("video/mp4")
            .map_err(|e| TransportError(format!("sendVideo: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", user_id.to_string())
            .part("video", part);

        let response = self
            .api
            .client
            .post(format!("{}/sendVideo", self.api.api_base))
            .timeout(Duration::from_secs(VIDEO_UPLOAD_TIMEOUT_SECS))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError(format!("sendVideo: {e}")))?;
        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| TransportError(format!("sendVideo: invalid response: {e}")))?;
        if !body.ok {
            return Err(TransportError(format!(
                "sendVideo: {}",
                body.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        Ok(())
    }

    async fn send_choice_prompt(
        &self,
        user_id: UserId,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), TransportError> {
        let _: serde_json::Value = self
            .api
            .call(
                "sendMessage",
                &json!({
                    "chat_id": user_id,
                    "text": text,
                    "reply_markup": inline_keyboard(choices),
                }),
            )
            .await?;
        Ok(())
    }
}

/// Long-poll update loop. Each event is handled on its own task so one
/// user's running job never blocks another user's conversation.
pub struct TelegramPoller {
    api: Arc<TelegramApi>,
    offset: i64,
}

impl TelegramPoller {
    pub fn new(api: Arc<TelegramApi>) -> Self {
        Self { api, offset: 0 }
    }

    pub async fn run(mut self, bot: BrandBot) -> Result<(), anyhow::Error> {
        tracing::info!("starting long-poll update loop");
        loop {
            let updates = match self.api.get_updates(self.offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, backing off");
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    continue;
                }
            };

            for update in updates {
                self.offset = self.offset.max(update.update_id + 1);
                let Some(pending) = pending_event(&update) else {
                    continue;
                };
                let event = match pending {
                    PendingEvent::Text { user_id, text } => {
                        crate::transport::InboundEvent::Text { user_id, text }
                    }
                    PendingEvent::Photo { user_id, file_id } => {
                        match self.api.download_file(&file_id).await {
                            Ok(bytes) => crate::transport::InboundEvent::Photo { user_id, bytes },
                            Err(e) => {
                                tracing::warn!(user_id, error = %e, "photo download failed");
                                continue;
                            }
                        }
                    }
                    PendingEvent::Choice {
                        user_id,
                        callback_id,
                        token,
                    } => {
                        if let Err(e) = self.api.answer_callback(&callback_id).await {
                            tracing::debug!(user_id, error = %e, "answerCallbackQuery failed");
                        }
                        crate::transport::InboundEvent::Choice { user_id, token }
                    }
                };

                let bot = bot.clone();
                tokio::spawn(async move { bot.handle_event(event).await });
            }
        }
    }
}
