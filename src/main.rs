//! Redis Publisher - Main Entry Point
//!
//! Reads configuration from the environment, connects to Redis with retry and
//! publishes a message every interval until SIGINT or SIGTERM arrives.

use clap::{Parser, Subcommand};
use redis_publisher::observability::{init_logging, parse_level, LogFormat};
use redis_publisher::{
    ConfigError, Publisher, PublisherConfig, PublisherError, PublisherResult, RedisBroker,
    Shutdown,
};
use std::process;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, Level};

/// Periodic Redis message publisher
#[derive(Parser)]
#[command(name = "redis-publisher")]
#[command(about = "Publish synthetic messages to a Redis channel and queue")]
#[command(version)]
struct Cli {
    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format: json, pretty or compact
    #[arg(long, env = "LOG_FORMAT", default_value = "json")]
    log_format: String,

    /// Include span open/close events in log output
    #[arg(long, env = "LOG_SPANS")]
    log_spans: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish until interrupted (default)
    Run,
    /// Inspect the configuration taken from the environment
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => parse_level(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string())),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    init_logging(level, LogFormat::parse(&cli.log_format), cli.log_spans);

    let config = match PublisherConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_publisher(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Publisher failed: {}", e);
        process::exit(e.exit_code());
    }
}

async fn run_publisher(config: PublisherConfig) -> PublisherResult<()> {
    let broker = RedisBroker::new(&config.redis, &config.retry)
        .map_err(|e| ConfigError::InvalidHost(format!("{}: {e}", config.redis.host)))?;

    let shutdown = Shutdown::new();
    install_signal_handlers(shutdown.clone())?;

    let mut publisher = Publisher::new(config, broker, shutdown);
    let summary = publisher.run().await?;

    info!(
        messages_sent = summary.messages_sent,
        "Application shutdown complete"
    );
    Ok(())
}

/// Flip the shutdown flag on SIGINT or SIGTERM; no broker I/O happens here
fn install_signal_handlers(shutdown: Shutdown) -> PublisherResult<()> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(PublisherError::Signal)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(PublisherError::Signal)?;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigint.recv() => { shutdown.trigger("SIGINT"); }
                _ = sigterm.recv() => { shutdown.trigger("SIGTERM"); }
            }
        }
    });

    Ok(())
}

fn handle_config_command(config: &PublisherConfig, show: bool) -> PublisherResult<()> {
    if show {
        match config.to_toml() {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => error!("Failed to render configuration: {}", e),
        }
    }

    info!(
        host = %config.redis.host,
        port = config.redis.port,
        pattern = %config.publish.pattern,
        "Configuration valid"
    );
    Ok(())
}
