use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::errors::TransportError;
use crate::domain::entities::{InboundMessage, OutboundReply, TransportEvent};

/// Transport trait - abstraction for the messaging platform client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the connection (and whatever authentication the platform needs)
    async fn connect(&self) -> Result<(), TransportError>;

    /// Deliver inbound events until the platform goes away or `events` is closed
    async fn listen(&self, events: mpsc::Sender<TransportEvent>) -> Result<(), TransportError>;

    /// Send a threaded reply, returning the platform id of the sent message
    async fn send_reply(&self, reply: &OutboundReply) -> Result<String, TransportError>;

    /// Release the connection
    async fn disconnect(&self);

    fn info(&self) -> TransportInfo;
}

/// Transport identity
#[derive(Debug, Clone)]
pub struct TransportInfo {
    pub platform: String,
    pub account: String,
}

/// Reply capability bound to the message that triggered a command
#[derive(Clone)]
pub struct ReplyHandle {
    transport: Arc<dyn Transport>,
    original: InboundMessage,
}

impl ReplyHandle {
    pub fn new(transport: Arc<dyn Transport>, original: InboundMessage) -> Self {
        Self { transport, original }
    }

    pub fn original(&self) -> &InboundMessage {
        &self.original
    }

    /// Send `text` as a reply quoting the original message
    pub async fn send(&self, text: impl Into<String>) -> Result<String, TransportError> {
        let reply = OutboundReply::quoting(&self.original, text);
        self.transport.send_reply(&reply).await
    }
}
