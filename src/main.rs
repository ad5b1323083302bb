//! GitLab SSE Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                   GATEWAY                      │
//!   GET /sse              │  ┌───────────┐    ┌──────────────────────┐    │
//!   ──────────────────────┼─▶│ transport │───▶│  session registry    │    │
//!   ◀── endpoint/events ──┼──│  handlers │    │  id → event queue    │    │
//!                         │  └───────────┘    └──────────▲───────────┘    │
//!   POST /messages/<id>   │  ┌───────────┐               │                │
//!   ──────────────────────┼─▶│ injection │───────────────┘                │
//!                         │  └───────────┘                                │
//!                         │                                               │
//!   GET /projects/...     │  ┌───────────┐    ┌──────────────┐            │
//!   ──────────────────────┼─▶│  gitlab   │───▶│ gitlab client│────────────┼──▶ GitLab
//!   ◀─────────────────────┼──│  routes   │◀───│   (reqwest)  │◀───────────┼─── API
//!                         │  └───────────┘    └──────────────┘            │
//!                         │                                               │
//!   POST /tool/hello      │  tools (include/exclude filtered)             │
//!                         │  config · observability · lifecycle           │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use gitlab_sse_gateway::http::HttpServer;
use gitlab_sse_gateway::lifecycle::{resolve_config, shutdown_signal, CliOverrides, Shutdown};
use gitlab_sse_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "gitlab-sse-gateway")]
#[command(about = "GitLab API gateway with an SSE message transport", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides PORT and the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address, e.g. 127.0.0.1:3000
    #[arg(long)]
    bind: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,

    /// Only serve these tools (comma-separated); wins over --excludes
    #[arg(long, value_delimiter = ',')]
    includes: Option<Vec<String>>,

    /// Do not serve these tools (comma-separated)
    #[arg(long, value_delimiter = ',')]
    excludes: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let overrides = CliOverrides {
        port: args.port,
        bind_address: args.bind,
        log_level: args.log_level,
        includes: args.includes,
        excludes: args.excludes,
    };
    let config = resolve_config(args.config.as_deref(), |key| std::env::var(key).ok(), &overrides)?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("gitlab-sse-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        gitlab = %config.gitlab.base_url,
        heartbeat_ms = config.transport.heartbeat_interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let server_task = tokio::spawn(server.run(listener, server_shutdown));

    shutdown_signal().await;
    shutdown.trigger();

    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
