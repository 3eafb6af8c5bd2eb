use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::application::messaging::MessageDispatcher;
use crate::domain::entities::TransportEvent;
use crate::infrastructure::logging::LogSink;

/// Why the event loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Interrupt or termination signal
    Shutdown,
    /// The transport stopped delivering events
    TransportClosed,
    /// The transport session was logged out
    LoggedOut,
}

/// Drives transport events into the dispatcher, one task per inbound message
pub struct EventRouter {
    dispatcher: Arc<MessageDispatcher>,
    sink: Arc<LogSink>,
    grace_period: Duration,
}

impl EventRouter {
    pub fn new(
        dispatcher: Arc<MessageDispatcher>,
        sink: Arc<LogSink>,
        grace_period: Duration,
    ) -> Self {
        Self {
            dispatcher,
            sink,
            grace_period,
        }
    }

    /// Serve events until `shutdown` resolves, the channel closes or the
    /// transport logs out. In-flight handlers get the grace period to finish.
    pub async fn run<S>(&self, mut events: mpsc::Receiver<TransportEvent>, shutdown: S) -> LoopExit
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut in_flight: JoinSet<()> = JoinSet::new();

        let exit = loop {
            tokio::select! {
                _ = &mut shutdown => break LoopExit::Shutdown,
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                event = events.recv() => match event {
                    Some(event) => {
                        if let Some(exit) = self.route(event, &mut in_flight) {
                            break exit;
                        }
                    }
                    None => break LoopExit::TransportClosed,
                },
            }
        };

        events.close();
        tracing::info!("Event loop stopped: {:?}", exit);
        self.drain(in_flight).await;
        exit
    }

    fn route(&self, event: TransportEvent, in_flight: &mut JoinSet<()>) -> Option<LoopExit> {
        match event {
            TransportEvent::Message(message) => {
                let dispatcher = Arc::clone(&self.dispatcher);
                let sink = Arc::clone(&self.sink);
                in_flight.spawn(async move {
                    let context = format!("event:message {}", message.id);
                    sink.supervise(&context, async move { dispatcher.dispatch(message).await })
                        .await;
                });
                None
            }
            TransportEvent::Receipt { chat_id, message_ids } => {
                tracing::debug!("Receipt in {} for {} message(s)", chat_id, message_ids.len());
                None
            }
            TransportEvent::Connected => {
                self.sink.supervise_sync("event:connected", || self.on_connected());
                None
            }
            TransportEvent::Disconnected { reason } => {
                let reason = reason.unwrap_or_else(|| "no reason given".to_string());
                self.sink.log_info(format_args!("❌ Disconnected: {}", reason), "Transport");
                None
            }
            TransportEvent::LoggedOut => {
                self.sink.log_error("🚪 Logged out by the platform", "Transport");
                Some(LoopExit::LoggedOut)
            }
        }
    }

    fn on_connected(&self) {
        self.sink.log_info("✅ Connected", "Transport");
        let catalog = self.dispatcher.catalog();
        let commands: Vec<_> = catalog.iter().map(|e| e.command.as_str()).collect();
        tracing::info!(
            "🤖 Ready for commands with prefix '{}': {}",
            self.dispatcher.parser().prefix(),
            commands.join(", ")
        );
        tracing::info!("⚡ Press Ctrl+C to stop");
    }

    async fn drain(&self, mut in_flight: JoinSet<()>) {
        if in_flight.is_empty() {
            return;
        }

        tracing::info!(
            "Waiting up to {:?} for {} in-flight handler(s)",
            self.grace_period,
            in_flight.len()
        );
        let finished = tokio::time::timeout(self.grace_period, async {
            while in_flight.join_next().await.is_some() {}
        })
        .await;

        if finished.is_err() {
            let abandoned = in_flight.len();
            in_flight.abort_all();
            // Aborted tasks drop their supervised handler, which aborts it too
            while in_flight.join_next().await.is_some() {}
            self.sink.log_info(
                format_args!(
                    "Abandoned {} in-flight handler(s) after {:?}",
                    abandoned, self.grace_period
                ),
                "Shutdown",
            );
        }
    }
}
