//! Telegram adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::application::errors::TransportError;
use crate::domain::entities::{Content, InboundMessage, OutboundReply, TransportEvent};
use crate::domain::traits::{Transport, TransportInfo};
use crate::infrastructure::storage::SessionStore;

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Long-poll timeout handed to getUpdates
const POLL_TIMEOUT_SECS: i64 = 30;

/// Pause before polling again after a failed request
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Session key holding the next update offset
const OFFSET_KEY: &str = "telegram-offset";

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub date: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub photo: Option<serde_json::Value>,
    pub sticker: Option<serde_json::Value>,
    pub voice: Option<serde_json::Value>,
    pub video: Option<serde_json::Value>,
    pub document: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope every Bot API response comes in
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    client: Client,
    me: OnceLock<User>,
    session: Option<SessionStore>,
    stopping: AtomicBool,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            me: OnceLock::new(),
            session: None,
            stopping: AtomicBool::new(false),
        }
    }

    /// Persist the update offset so a restart does not replay old messages
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(TransportError::Unauthorized(format!("{} rejected the bot token", method)));
        }

        let data: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))?;

        match data.result {
            Some(result) if data.ok => Ok(result),
            _ => Err(TransportError::Network(format!(
                "Telegram API error ({}): {}",
                status,
                data.description.unwrap_or_default()
            ))),
        }
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout: i64,
    ) -> Result<Vec<Update>, TransportError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: i64,
            allowed_updates: Vec<String>,
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: vec!["message".to_string()],
        };
        self.call("getUpdates", &request).await
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update]) -> i64 {
        updates.iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(0)
    }

    /// Map an update onto a transport event
    pub fn to_event(&self, update: Update) -> Option<TransportEvent> {
        let msg = update.message?;
        let bot_id = self.me.get().map(|u| u.id);

        let content = match (&msg.text, kind_of(&msg)) {
            (Some(text), _) => Content::Text(text.clone()),
            (None, Some(kind)) => Content::Media(kind.to_string()),
            (None, None) => Content::Empty,
        };
        let sender = msg.from.as_ref().map(|u| u.id).unwrap_or(msg.chat.id);

        let mut inbound = InboundMessage::new(msg.chat.id.to_string(), sender.to_string(), content)
            .with_id(msg.message_id.to_string())
            .with_platform("telegram");
        inbound.timestamp = DateTime::<Utc>::from_timestamp(msg.date, 0).unwrap_or_else(Utc::now);
        inbound.is_from_self = bot_id == Some(sender);

        Some(TransportEvent::Message(inbound))
    }

    /// Send a message with specific parse mode
    async fn send_with_format(
        &self,
        reply: &OutboundReply,
        parse_mode: Option<&str>,
    ) -> Result<String, TransportError> {
        #[derive(Serialize)]
        struct ReplyParameters {
            message_id: i64,
            allow_sending_without_reply: bool,
        }

        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: &'a str,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            parse_mode: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_parameters: Option<ReplyParameters>,
        }

        #[derive(Deserialize)]
        struct MessageResult {
            message_id: i64,
        }

        let request = SendMessageRequest {
            chat_id: &reply.chat_id,
            text: &reply.text,
            parse_mode,
            reply_parameters: reply.quoted.message_id.parse().ok().map(|message_id| {
                ReplyParameters {
                    message_id,
                    allow_sending_without_reply: true,
                }
            }),
        };

        let sent: MessageResult = self.call("sendMessage", &request).await?;
        Ok(sent.message_id.to_string())
    }

    async fn load_offset(&self) -> i64 {
        match &self.session {
            Some(session) => session
                .read_value(OFFSET_KEY)
                .await
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            None => 0,
        }
    }

    async fn save_offset(&self, offset: i64) {
        if let Some(session) = &self.session {
            if let Err(e) = session.write_value(OFFSET_KEY, &offset.to_string()).await {
                tracing::warn!("Failed to persist update offset: {}", e);
            }
        }
    }
}

fn kind_of(msg: &Message) -> Option<&'static str> {
    [
        ("photo", msg.photo.is_some()),
        ("sticker", msg.sticker.is_some()),
        ("voice", msg.voice.is_some()),
        ("video", msg.video.is_some()),
        ("document", msg.document.is_some()),
    ]
    .into_iter()
    .find_map(|(kind, present)| present.then_some(kind))
}

#[async_trait]
impl Transport for TelegramAdapter {
    async fn connect(&self) -> Result<(), TransportError> {
        let me: User = self
            .call("getMe", &serde_json::json!({}))
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::info!("Bot started: @{}", me.username.as_deref().unwrap_or("unknown"));
        let _ = self.me.set(me);
        Ok(())
    }

    async fn listen(&self, events: mpsc::Sender<TransportEvent>) -> Result<(), TransportError> {
        let mut offset = self.load_offset().await;
        let mut online = true;
        if events.send(TransportEvent::Connected).await.is_err() {
            return Ok(());
        }

        tracing::info!("Starting message loop...");
        while !self.stopping.load(Ordering::Relaxed) {
            match self.get_updates(offset, POLL_TIMEOUT_SECS).await {
                Ok(updates) => {
                    if !online {
                        online = true;
                        if events.send(TransportEvent::Connected).await.is_err() {
                            return Ok(());
                        }
                    }
                    if updates.is_empty() {
                        continue;
                    }

                    tracing::debug!("Received {} updates", updates.len());
                    offset = offset.max(Self::get_next_offset(&updates));
                    for update in updates {
                        if let Some(event) = self.to_event(update) {
                            if events.send(event).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                    self.save_offset(offset).await;
                }
                Err(TransportError::Unauthorized(reason)) => {
                    tracing::error!("Telegram session rejected: {}", reason);
                    let _ = events.send(TransportEvent::LoggedOut).await;
                    return Ok(());
                }
                Err(e) => {
                    if online {
                        online = false;
                        let reason = Some(e.to_string());
                        if events.send(TransportEvent::Disconnected { reason }).await.is_err() {
                            return Ok(());
                        }
                    }
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
        Ok(())
    }

    async fn send_reply(&self, reply: &OutboundReply) -> Result<String, TransportError> {
        if self.stopping.load(Ordering::Relaxed) {
            return Err(TransportError::Closed);
        }
        tracing::debug!("Sending to {}: {}", reply.chat_id, reply.text);

        // Try Markdown first, fall back to plain text
        match self.send_with_format(reply, Some("Markdown")).await {
            Ok(id) => Ok(id),
            Err(TransportError::Network(e)) => {
                tracing::warn!("Markdown failed, using plain text: {}", e);
                self.send_with_format(reply, None)
                    .await
                    .map_err(|e| TransportError::Send(e.to_string()))
            }
            Err(e) => Err(TransportError::Send(e.to_string())),
        }
    }

    async fn disconnect(&self) {
        self.stopping.store(true, Ordering::Relaxed);
        tracing::info!("Telegram transport stopping");
    }

    fn info(&self) -> TransportInfo {
        TransportInfo {
            platform: "telegram".to_string(),
            account: self
                .me
                .get()
                .and_then(|u| u.username.clone())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}
