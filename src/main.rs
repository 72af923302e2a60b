//! HTTP/1.1 server over raw TCP.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client bytes (any fragmentation)
//!     ─────────────────────────────▶ net::listener (bounded accept)
//!                                        │  one task per connection
//!                                        ▼
//!                                    net::connection
//!                                        │
//!                          ┌─────────────┴─────────────┐
//!                          ▼                           ▼
//!                   http::reader                 error response
//!                   (incremental parse)          (400 / 413 / 500)
//!                          │
//!                          ▼
//!                   handlers::demo ──▶ http::response (ordered writer)
//!                                              │
//!     Client response ◀────────────────────────┘
//!
//!     Cross-cutting: config (TOML + CLI), lifecycle (signals, drain),
//!                    observability (tracing, Prometheus)
//! ```

use std::path::PathBuf;

use clap::Parser;

use tcp_http::config::validation::validate_config;
use tcp_http::config::{load_config, ConfigError, ServerConfig};
use tcp_http::handlers::DemoHandler;
use tcp_http::http::HttpServer;
use tcp_http::lifecycle::{shutdown_signal, Shutdown};
use tcp_http::net::Listener;
use tcp_http::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "httpserver")]
#[command(about = "Incremental HTTP/1.1 server over raw TCP", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "httpserver starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        max_buffer_size = config.parser.max_buffer_size,
        drain_timeout_secs = config.lifecycle.drain_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;
    let handler = DemoHandler::new(&config.demo)?;
    let server = HttpServer::new(&config, handler);

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
