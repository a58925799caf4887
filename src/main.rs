//! Request context demo server.
//!
//! Serves a few routes behind the request context middleware so the ids
//! can be seen in responses, headers and log lines.
//!
//! ```text
//! request-context --config demo.toml --log-format json
//! curl -i -H 'X-Correlation-Id: upstream-1' localhost:8080/users/42
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use request_context::config::{load_config, AppConfig, LogFormat};
use request_context::http::HttpServer;
use request_context::lifecycle::Shutdown;
use request_context::observability::logging;
use request_context::{AdapterKind, Result};

#[derive(Parser)]
#[command(name = "request-context")]
#[command(about = "Demo server for per-request context propagation", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `logging.format`
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Override `context.adapter` (`task_local` or `span`)
    #[arg(long)]
    adapter: Option<AdapterKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    if let Some(adapter) = cli.adapter {
        config.context.adapter = adapter;
    }

    logging::init(&config.logging)?;
    tracing::info!("request-context v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        adapter = %config.context.adapter,
        "Configuration loaded"
    );

    // Bind TCP listener
    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
