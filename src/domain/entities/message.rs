use chrono::{DateTime, Utc};

/// Payload carried by an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Plain conversation text
    Text(String),
    /// Anything non-textual (photo, sticker, voice note...), tagged by kind
    Media(String),
    Empty,
}

impl Content {
    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A message received from the transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub is_from_self: bool,
    pub content: Content,
    pub timestamp: DateTime<Utc>,
    pub platform: String,
}

impl InboundMessage {
    pub fn new(chat_id: impl Into<String>, sender_id: impl Into<String>, content: Content) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            is_from_self: false,
            content,
            timestamp: Utc::now(),
            platform: "unknown".to_string(),
        }
    }

    pub fn from_text(
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(chat_id, sender_id, Content::Text(text.into()))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn from_self(mut self) -> Self {
        self.is_from_self = true;
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Non-empty plain text body, if this message carries one
    pub fn text_body(&self) -> Option<&str> {
        self.content.text().filter(|t| !t.is_empty())
    }
}

/// The part of the original message a reply quotes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedMessage {
    pub message_id: String,
    pub participant: String,
    pub text: String,
}

/// A threaded reply headed for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub chat_id: String,
    pub text: String,
    pub quoted: QuotedMessage,
}

impl OutboundReply {
    pub fn quoting(original: &InboundMessage, text: impl Into<String>) -> Self {
        Self {
            chat_id: original.chat_id.clone(),
            text: text.into(),
            quoted: QuotedMessage {
                message_id: original.id.clone(),
                participant: original.sender_id.clone(),
                text: original.content.text().unwrap_or_default().to_string(),
            },
        }
    }
}

/// Transport-level events delivered to the bot
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Message(InboundMessage),
    Receipt { chat_id: String, message_ids: Vec<String> },
    Connected,
    Disconnected { reason: Option<String> },
    LoggedOut,
}
