//! Query Proxy
//!
//! Accepts JSON query envelopes over HTTP, rewrites the query through the
//! middleware chain and streams the backend's response back.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ proxy::Proxy::serve (spawned task)
//!                                         │
//!                        ACQUIRE  pool: buffer, reader, invoker
//!                        ACCEPT   routing → envelope decode → middleware chain
//!                        DISPATCH upstream::HttpTransport ──────────────▶ Backend
//!                        RELAY    backend body → ResponseSink ◀──────────
//!                        RELEASE  guards dropped, streams closed
//!                                         │
//!     Client Response                     ▼
//!     ◀────────────── http::response::PendingResponse (streaming body)
//!
//!     config (TOML + watcher) · observability (tracing, metrics) · lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use query_proxy::config::loader::load_config;
use query_proxy::config::watcher::ConfigWatcher;
use query_proxy::lifecycle::{apply_reloads, build_proxy, Shutdown};
use query_proxy::observability::{logging, metrics};
use query_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "query-proxy")]
#[command(about = "Query-rewriting HTTP proxy", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/proxy.toml")]
    config: PathBuf,

    /// Disable reloading routes when the config file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    logging::init_logging(&config.observability);

    tracing::info!("query-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = ?args.config,
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (proxy, routes) = build_proxy(&config, Vec::new())?;
    let shutdown = Shutdown::new();

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = if args.no_watch {
        None
    } else {
        match ConfigWatcher::new(&args.config).spawn() {
            Ok((handle, updates)) => {
                tokio::spawn(apply_reloads(routes.clone(), updates, shutdown.subscribe()));
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                None
            }
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, proxy);
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
