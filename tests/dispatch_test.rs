//! End-to-end dispatch tests against an in-memory transport
//! Run with: cargo test --test dispatch_test

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

use furina_bot::application::errors::{HandlerError, TransportError};
use furina_bot::application::messaging::{DispatchOutcome, IgnoreReason, MessageDispatcher};
use furina_bot::application::services::{EventRouter, LoopExit};
use furina_bot::application::startup::StartupInfo;
use furina_bot::domain::entities::{Content, InboundMessage, OutboundReply, ParserConfig, TransportEvent};
use furina_bot::domain::traits::{Transport, TransportInfo};
use furina_bot::infrastructure::logging::LogSink;
use furina_bot::plugins::general::{MenuPlugin, PingPlugin};
use furina_bot::plugins::{CommandContext, DuplicatePolicy, Plugin, PluginManager};

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<OutboundReply>>,
    fail_sends: bool,
}

impl RecordingTransport {
    fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<OutboundReply> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn listen(&self, _events: mpsc::Sender<TransportEvent>) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send_reply(&self, reply: &OutboundReply) -> Result<String, TransportError> {
        if self.fail_sends {
            return Err(TransportError::Send("socket closed".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(reply.clone());
        Ok(format!("out-{}", sent.len()))
    }

    async fn disconnect(&self) {}

    fn info(&self) -> TransportInfo {
        TransportInfo {
            platform: "memory".to_string(),
            account: "test".to_string(),
        }
    }
}

enum Behaviour {
    Reply,
    Fail,
    Panic,
    Sleep(Duration),
}

struct TestPlugin {
    name: &'static str,
    commands: &'static [&'static str],
    behaviour: Behaviour,
    hits: Arc<AtomicUsize>,
}

impl TestPlugin {
    fn new(name: &'static str, commands: &'static [&'static str], behaviour: Behaviour) -> (Self, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let plugin = Self {
            name,
            commands,
            behaviour,
            hits: Arc::clone(&hits),
        };
        (plugin, hits)
    }
}

#[async_trait]
impl Plugin for TestPlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn commands(&self) -> &[&str] {
        self.commands
    }

    fn description(&self) -> &str {
        "test handler"
    }

    async fn handle(&self, ctx: &CommandContext) -> Result<(), HandlerError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Reply => {
                ctx.reply(format!("{} handled {:?}", self.name, ctx.args())).await?;
                Ok(())
            }
            Behaviour::Fail => Err(HandlerError::ExecutionFailed("database is down".to_string())),
            Behaviour::Panic => panic!("{} blew up", self.name),
            Behaviour::Sleep(d) => {
                tokio::time::sleep(*d).await;
                ctx.reply("done").await?;
                Ok(())
            }
        }
    }
}

struct Harness {
    dispatcher: Arc<MessageDispatcher>,
    transport: Arc<RecordingTransport>,
    sink: Arc<LogSink>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn build(transport: RecordingTransport, setup: impl FnOnce(&mut PluginManager)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(LogSink::open(dir.path().join("logs"), "furina-bot"));
        let mut plugins = PluginManager::new(ParserConfig::default(), DuplicatePolicy::Override);
        setup(&mut plugins);

        let transport = Arc::new(transport);
        let dispatcher = Arc::new(MessageDispatcher::new(
            plugins,
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&sink),
        ));
        Self {
            dispatcher,
            transport,
            sink,
            _dir: dir,
        }
    }

    fn with_baseline() -> Self {
        Self::build(RecordingTransport::default(), |plugins| {
            let startup = Arc::new(StartupInfo::new("furina-bot", ParserConfig::default()));
            plugins.register(PingPlugin::new(Arc::clone(&startup))).unwrap();
            plugins.register(MenuPlugin::new(startup)).unwrap();
        })
    }

    fn log(&self) -> String {
        read_logs(self.sink.directory())
    }

    async fn send(&self, text: &str) -> DispatchOutcome {
        self.dispatcher.dispatch(message(text)).await
    }
}

fn read_logs(dir: &Path) -> String {
    let mut out = String::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries {
            out.push_str(&std::fs::read_to_string(entry.unwrap().path()).unwrap());
        }
    }
    out
}

fn message(text: &str) -> InboundMessage {
    InboundMessage::from_text("chat-1", "alice", text)
}

fn handled(handler: &str) -> DispatchOutcome {
    DispatchOutcome::Handled {
        handler: handler.to_string(),
    }
}

#[tokio::test]
async fn ping_replies_once_quoting_the_original() {
    let bot = Harness::with_baseline();
    let msg = message("!ping").with_id("wa-123");

    assert_eq!(bot.dispatcher.dispatch(msg).await, handled("ping"));

    let sent = bot.transport.sent();
    assert_eq!(sent.len(), 1);
    let reply = &sent[0];
    assert_eq!(reply.chat_id, "chat-1");
    assert_eq!(reply.quoted.message_id, "wa-123");
    assert_eq!(reply.quoted.participant, "alice");
    assert_eq!(reply.quoted.text, "!ping");
    for figure in ["Uptime", "Memory Usage", "Runtime Workers", "Live Tasks", "Response Time"] {
        assert!(reply.text.contains(figure), "missing {figure}");
    }
}

#[tokio::test]
async fn menu_lists_commands_and_prefix() {
    let bot = Harness::with_baseline();

    assert_eq!(bot.send("!menu").await, handled("help"));

    let sent = bot.transport.sent();
    assert_eq!(sent.len(), 1);
    let text = &sent[0].text;
    assert!(text.contains("`!ping` - Check that the bot is alive"));
    assert!(text.contains("`!menu` - Show this list of commands"));
    assert!(text.contains("Prefix: `!`"));
}

#[tokio::test]
async fn command_names_are_case_insensitive_by_default() {
    let bot = Harness::with_baseline();
    assert_eq!(bot.send("  !PING  ").await, handled("ping"));
    assert_eq!(bot.transport.sent().len(), 1);
}

#[tokio::test]
async fn plain_text_and_unknown_commands_are_silent() {
    let bot = Harness::with_baseline();

    assert_eq!(bot.send("hello").await, DispatchOutcome::Ignored(IgnoreReason::NotACommand));
    assert_eq!(bot.send("!unknown").await, DispatchOutcome::Ignored(IgnoreReason::UnknownCommand));
    assert_eq!(bot.send("!").await, DispatchOutcome::Ignored(IgnoreReason::NotACommand));

    assert!(bot.transport.sent().is_empty());
    let log = bot.log();
    assert!(!log.contains("ERROR"), "unexpected error entry: {log}");
    assert!(!log.contains("PANIC"), "unexpected panic entry: {log}");
}

#[tokio::test]
async fn own_messages_and_media_are_ignored() {
    let bot = Harness::with_baseline();

    let own = message("!ping").from_self();
    let photo = InboundMessage::new("chat-1", "alice", Content::Media("photo".to_string()));
    let empty = InboundMessage::new("chat-1", "alice", Content::Empty);

    assert_eq!(bot.dispatcher.dispatch(own).await, DispatchOutcome::Ignored(IgnoreReason::FromSelf));
    assert_eq!(bot.dispatcher.dispatch(photo).await, DispatchOutcome::Ignored(IgnoreReason::NoText));
    assert_eq!(bot.dispatcher.dispatch(empty).await, DispatchOutcome::Ignored(IgnoreReason::NoText));
    assert!(bot.transport.sent().is_empty());
}

#[tokio::test]
async fn disjoint_handlers_each_receive_only_their_commands() {
    let (alpha, alpha_hits) = TestPlugin::new("alpha", &["a1", "a2"], Behaviour::Reply);
    let (beta, beta_hits) = TestPlugin::new("beta", &["b1"], Behaviour::Reply);
    let bot = Harness::build(RecordingTransport::default(), |plugins| {
        plugins.register(alpha).unwrap();
        plugins.register(beta).unwrap();
    });

    assert_eq!(bot.send("!a1 x").await, handled("alpha"));
    assert_eq!(bot.send("!a2").await, handled("alpha"));
    assert_eq!(bot.send("!b1 Y z").await, handled("beta"));

    assert_eq!(alpha_hits.load(Ordering::SeqCst), 2);
    assert_eq!(beta_hits.load(Ordering::SeqCst), 1);
    let texts: Vec<_> = bot.transport.sent().into_iter().map(|r| r.text).collect();
    assert_eq!(texts[2], r#"beta handled ["Y", "z"]"#);
}

#[tokio::test]
async fn overlapping_command_runs_exactly_the_latest_handler() {
    let (first, first_hits) = TestPlugin::new("first", &["shared"], Behaviour::Reply);
    let (second, second_hits) = TestPlugin::new("second", &["shared"], Behaviour::Reply);
    let bot = Harness::build(RecordingTransport::default(), |plugins| {
        plugins.register(first).unwrap();
        plugins.register(second).unwrap();
    });

    assert_eq!(bot.send("!shared").await, handled("second"));
    assert_eq!(first_hits.load(Ordering::SeqCst), 0);
    assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    assert_eq!(bot.transport.sent().len(), 1);
}

#[tokio::test]
async fn panicking_handler_is_contained() {
    let (boom, _) = TestPlugin::new("boom", &["boom"], Behaviour::Panic);
    let (echo, echo_hits) = TestPlugin::new("echo", &["echo"], Behaviour::Reply);
    let bot = Harness::build(RecordingTransport::default(), |plugins| {
        plugins.register(boom).unwrap();
        plugins.register(echo).unwrap();
    });

    assert_eq!(
        bot.send("!boom").await,
        DispatchOutcome::Panicked { handler: "boom".to_string() }
    );
    assert_eq!(bot.send("!echo after").await, handled("echo"));

    assert_eq!(echo_hits.load(Ordering::SeqCst), 1);
    assert_eq!(bot.transport.sent().len(), 1);
    assert!(bot.log().contains("PANIC in boom/boom: boom blew up"));
}

#[tokio::test]
async fn handler_errors_are_logged_not_replied() {
    let (broken, _) = TestPlugin::new("broken", &["report"], Behaviour::Fail);
    let bot = Harness::build(RecordingTransport::default(), |plugins| {
        plugins.register(broken).unwrap();
    });

    assert_eq!(
        bot.send("!report").await,
        DispatchOutcome::Failed { handler: "broken".to_string() }
    );
    assert!(bot.transport.sent().is_empty());
    assert!(bot.log().contains("ERROR in broken/report: Execution failed: database is down"));
}

#[tokio::test]
async fn reply_failures_surface_as_handler_errors() {
    let startup = Arc::new(StartupInfo::new("furina-bot", ParserConfig::default()));
    let bot = Harness::build(RecordingTransport::failing(), |plugins| {
        plugins.register(PingPlugin::new(startup)).unwrap();
    });

    assert_eq!(
        bot.send("!ping").await,
        DispatchOutcome::Failed { handler: "ping".to_string() }
    );
    assert!(bot.log().contains("ERROR in ping/ping: Reply failed: Send failed: socket closed"));
}

#[tokio::test]
async fn dispatch_keeps_working_without_log_storage() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "x").unwrap();
    let sink = Arc::new(LogSink::open(blocker.join("logs"), "furina-bot"));
    assert!(!sink.is_persistent());

    let (boom, _) = TestPlugin::new("boom", &["boom"], Behaviour::Panic);
    let (echo, _) = TestPlugin::new("echo", &["echo"], Behaviour::Reply);
    let mut plugins = PluginManager::new(ParserConfig::default(), DuplicatePolicy::Override);
    plugins.register(boom).unwrap();
    plugins.register(echo).unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = MessageDispatcher::new(plugins, Arc::clone(&transport) as Arc<dyn Transport>, Arc::clone(&sink));

    dispatcher.dispatch(message("!boom")).await;
    sink.log_info("still running", "test");
    sink.log_error("still running", "test");
    assert_eq!(dispatcher.dispatch(message("!echo")).await, handled("echo"));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn router_serves_until_the_channel_closes() {
    let (echo, hits) = TestPlugin::new("echo", &["echo"], Behaviour::Reply);
    let (boom, _) = TestPlugin::new("boom", &["boom"], Behaviour::Panic);
    let bot = Harness::build(RecordingTransport::default(), |plugins| {
        plugins.register(echo).unwrap();
        plugins.register(boom).unwrap();
    });
    let router = EventRouter::new(Arc::clone(&bot.dispatcher), Arc::clone(&bot.sink), Duration::from_secs(5));

    let (tx, rx) = mpsc::channel(64);
    tx.send(TransportEvent::Connected).await.unwrap();
    for i in 0..20 {
        tx.send(TransportEvent::Message(message(&format!("!echo {i}")))).await.unwrap();
    }
    tx.send(TransportEvent::Message(message("!boom"))).await.unwrap();
    tx.send(TransportEvent::Receipt { chat_id: "chat-1".into(), message_ids: vec!["1".into()] }).await.unwrap();
    tx.send(TransportEvent::Message(message("!echo last"))).await.unwrap();
    drop(tx);

    let exit = router.run(rx, std::future::pending()).await;

    assert_eq!(exit, LoopExit::TransportClosed);
    assert_eq!(hits.load(Ordering::SeqCst), 21);
    assert_eq!(bot.transport.sent().len(), 21);
    let log = bot.log();
    assert!(log.contains("INFO in Transport: ✅ Connected"));
    assert!(log.contains("PANIC in boom/boom"));
}

#[tokio::test]
async fn router_stops_on_logout() {
    let bot = Harness::with_baseline();
    let router = EventRouter::new(Arc::clone(&bot.dispatcher), Arc::clone(&bot.sink), Duration::from_secs(1));

    let (tx, rx) = mpsc::channel(8);
    tx.send(TransportEvent::LoggedOut).await.unwrap();

    let exit = router.run(rx, std::future::pending()).await;
    assert_eq!(exit, LoopExit::LoggedOut);
    assert!(bot.log().contains("ERROR in Transport"));
    drop(tx);
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_handlers_within_grace() {
    let (slow, _) = TestPlugin::new("slow", &["slow"], Behaviour::Sleep(Duration::from_millis(100)));
    let bot = Harness::build(RecordingTransport::default(), |plugins| {
        plugins.register(slow).unwrap();
    });
    let router = EventRouter::new(Arc::clone(&bot.dispatcher), Arc::clone(&bot.sink), Duration::from_secs(5));

    let (tx, rx) = mpsc::channel(8);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    tx.send(TransportEvent::Message(message("!slow"))).await.unwrap();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = stop_tx.send(());
    });

    let exit = router.run(rx, async { let _ = stop_rx.await; }).await;

    assert_eq!(exit, LoopExit::Shutdown);
    assert_eq!(bot.transport.sent().len(), 1);
    assert!(!bot.log().contains("Abandoned"));
    drop(tx);
}

#[tokio::test]
async fn shutdown_abandons_handlers_after_grace() {
    let (stuck, hits) = TestPlugin::new("stuck", &["stuck"], Behaviour::Sleep(Duration::from_secs(30)));
    let bot = Harness::build(RecordingTransport::default(), |plugins| {
        plugins.register(stuck).unwrap();
    });
    let router = EventRouter::new(Arc::clone(&bot.dispatcher), Arc::clone(&bot.sink), Duration::from_millis(100));

    let (tx, rx) = mpsc::channel(8);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    tx.send(TransportEvent::Message(message("!stuck"))).await.unwrap();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = stop_tx.send(());
    });

    let started = Instant::now();
    let exit = router.run(rx, async { let _ = stop_rx.await; }).await;

    assert_eq!(exit, LoopExit::Shutdown);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(bot.transport.sent().is_empty());
    assert!(bot.log().contains("Abandoned 1 in-flight handler(s)"));
    drop(tx);
}

#[tokio::test]
async fn abandoned_handlers_never_reply_after_shutdown() {
    let (slow, hits) = TestPlugin::new("slow", &["slow"], Behaviour::Sleep(Duration::from_millis(300)));
    let bot = Harness::build(RecordingTransport::default(), |plugins| {
        plugins.register(slow).unwrap();
    });
    let router = EventRouter::new(Arc::clone(&bot.dispatcher), Arc::clone(&bot.sink), Duration::from_millis(50));

    let (tx, rx) = mpsc::channel(8);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    tx.send(TransportEvent::Message(message("!slow"))).await.unwrap();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = stop_tx.send(());
    });

    let exit = router.run(rx, async { let _ = stop_rx.await; }).await;
    assert_eq!(exit, LoopExit::Shutdown);
    assert!(bot.log().contains("Abandoned 1 in-flight handler(s)"));
    bot.sink.close().unwrap();

    // well past the point the handler would have replied
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(bot.transport.sent().is_empty());
    drop(tx);
}
