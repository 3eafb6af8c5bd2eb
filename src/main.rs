use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use furina_bot::application::errors::{BotError, ConfigError};
use furina_bot::application::messaging::MessageDispatcher;
use furina_bot::application::services::{EventRouter, LoopExit};
use furina_bot::application::startup::StartupInfo;
use furina_bot::domain::traits::Transport;
use furina_bot::infrastructure::adapters::{ConsoleAdapter, TelegramAdapter};
use furina_bot::infrastructure::config::{Config, TransportChoice};
use furina_bot::infrastructure::logging::LogSink;
use furina_bot::infrastructure::storage::SessionStore;
use furina_bot::plugins::general::{MenuPlugin, PingPlugin};
use furina_bot::plugins::PluginManager;

/// Capacity of the transport -> router event channel
const EVENT_BUFFER: usize = 256;

#[derive(Parser)]
#[command(name = "furina-bot")]
#[command(about = "A chat-command bot that keeps serving when a handler fails", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Telegram bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Print the default config
    InitConfig,
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config, cli.token),
        Commands::Version => {
            println!("furina-bot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config = if std::path::Path::new(path).exists() {
        let mut config = Config::load(path)?;
        config.apply_env();
        config
    } else {
        tracing::info!("{} not found, using defaults", path);
        Config::load_env()
    };
    config.validate()?;
    Ok(config)
}

fn run_bot(config_path: &str, token_override: Option<String>) -> Result<(), BotError> {
    let config = load_config(config_path)?;
    tracing::info!("Starting {}", config.bot.name);

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(serve(config, token_override));

    // stdin readers sit on blocking threads; don't wait on them forever
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn serve(config: Config, token_override: Option<String>) -> Result<(), BotError> {
    let sink = Arc::new(LogSink::open(&config.logging.directory, config.logging.file_stem.clone()));
    let session = SessionStore::prepare(&config.session.directory, &sink).await?;
    let startup = Arc::new(StartupInfo::from_config(&config)?);

    let mut plugins = PluginManager::new(startup.parser.clone(), config.bot.on_duplicate_command);
    plugins.register(PingPlugin::new(Arc::clone(&startup)))?;
    plugins.register(MenuPlugin::new(Arc::clone(&startup)))?;
    tracing::info!("Registered {} handlers", plugins.len());

    let transport: Arc<dyn Transport> = match config.select_transport(token_override)? {
        TransportChoice::Telegram { token } => {
            Arc::new(TelegramAdapter::new(token).with_session(session))
        }
        TransportChoice::Console => Arc::new(ConsoleAdapter::new()),
    };

    if let Err(e) = transport.connect().await {
        sink.log_error(&e, "Transport.connect");
        if let Err(flush) = sink.close() {
            tracing::warn!("Failed to flush log file: {}", flush);
        }
        return Err(e.into());
    }
    sink.log_info(format_args!("Connected via {}", transport.info().platform), "main");

    let dispatcher = MessageDispatcher::new(plugins, Arc::clone(&transport), Arc::clone(&sink));
    let dispatcher = Arc::new(dispatcher);
    let router = EventRouter::new(dispatcher, Arc::clone(&sink), config.shutdown.grace_period());

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let listener = {
        let transport = Arc::clone(&transport);
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            if let Err(e) = transport.listen(tx).await {
                sink.log_error(&e, "Transport.listen");
            }
        })
    };

    let exit = router.run(rx, shutdown_signal()).await;
    if exit == LoopExit::Shutdown {
        println!("\nStopping bot...");
    }
    listener.abort();

    // Teardown order: log sink first, then the transport connection
    let teardown_sink = Arc::clone(&sink);
    sink.supervise("shutdown", async move {
        teardown_sink.log_info(format_args!("Shutting down ({:?})", exit), "main");
        if let Err(e) = teardown_sink.close() {
            tracing::warn!("Failed to flush log file: {}", e);
        }
        transport.disconnect().await;
    })
    .await;

    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn init_config() -> Result<(), BotError> {
    let yaml = serde_yaml::to_string(&Config::default())
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    println!("{}", yaml);
    println!("\nSave this to config.yaml and adjust as needed.");
    Ok(())
}
