//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::application::errors::TransportError;
use crate::domain::entities::{InboundMessage, OutboundReply, TransportEvent};
use crate::domain::traits::{Transport, TransportInfo};

const CONSOLE_CHAT: &str = "console";
const CONSOLE_USER: &str = "console-user";

/// Console transport: every stdin line is an inbound message from one local user
pub struct ConsoleAdapter {
    info: TransportInfo,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: TransportInfo {
                platform: "console".to_string(),
                account: "furina-bot".to_string(),
            },
        }
    }

    /// Build the inbound message for one typed line
    pub fn message_for(line: &str) -> InboundMessage {
        InboundMessage::from_text(CONSOLE_CHAT, CONSOLE_USER, line).with_platform("console")
    }

    /// How a reply is printed
    pub fn render(reply: &OutboundReply) -> String {
        format!("[BOT] ↪ {}: \"{}\"\n{}", reply.quoted.participant, reply.quoted.text, reply.text)
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConsoleAdapter {
    async fn connect(&self) -> Result<(), TransportError> {
        tracing::info!("Starting console bot (dev mode)");
        Ok(())
    }

    async fn listen(&self, events: mpsc::Sender<TransportEvent>) -> Result<(), TransportError> {
        if events.send(TransportEvent::Connected).await.is_err() {
            return Ok(());
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            let event = match line {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => TransportEvent::Message(Self::message_for(&line)),
                None => {
                    let reason = Some("stdin closed".to_string());
                    let _ = events.send(TransportEvent::Disconnected { reason }).await;
                    return Ok(());
                }
            };

            if events.send(event).await.is_err() {
                return Ok(());
            }
        }
    }

    async fn send_reply(&self, reply: &OutboundReply) -> Result<String, TransportError> {
        println!("{}", Self::render(reply));
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn disconnect(&self) {
        tracing::info!("Console transport closed");
    }

    fn info(&self) -> TransportInfo {
        self.info.clone()
    }
}
