//! Startup orchestration.
//!
//! # Responsibilities
//! - Compile the route table from a validated configuration
//! - Build pools, transport and pipeline in dependency order
//! - Apply configuration reloads to the live route table
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The pipeline reads routes through `SharedRouteTable`, so reloads never
//!   rebuild the pipeline itself

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::config::ProxyConfig;
use crate::middleware::QueryMiddleware;
use crate::proxy::{Proxy, ProxyOptions, ProxyPools};
use crate::routing::{RouteTable, RouteTableError, SharedRouteTable};
use crate::upstream::HttpTransport;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build route table: {0}")]
    Routes(#[from] RouteTableError),

    #[error("no routes configured: add `routes` or a `default_route`")]
    NoRoutes,
}

/// Build the pipeline for `config`, running `steps` as its middleware chain.
///
/// Returns the proxy and the shared route table it reads from, so callers
/// can swap in reloaded routes.
pub fn build_proxy(
    config: &ProxyConfig,
    steps: Vec<Arc<dyn QueryMiddleware>>,
) -> Result<(Arc<Proxy>, Arc<SharedRouteTable>), StartupError> {
    let table = RouteTable::from_config(config)?;
    if table.is_empty() && !table.has_default() {
        return Err(StartupError::NoRoutes);
    }
    tracing::info!(
        routes = table.len(),
        has_default = table.has_default(),
        middlewares = steps.len(),
        "Route table compiled"
    );

    let routes = Arc::new(SharedRouteTable::new(table));
    let pools = ProxyPools::with_chain(&config.pools, steps);
    let proxy = Proxy::builder(routes.clone(), pools)
        .transport(Arc::new(HttpTransport::new(&config.timeouts)))
        .options(ProxyOptions::from(&config.pipeline))
        .build();

    Ok((Arc::new(proxy), routes))
}

/// Apply reloaded configurations to `routes` until shutdown.
///
/// A reload whose routes fail to compile keeps the current table.
pub async fn apply_reloads(
    routes: Arc<SharedRouteTable>,
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                match RouteTable::from_config(&config) {
                    Ok(table) => {
                        tracing::info!(routes = table.len(), "Route table reloaded");
                        routes.store(table);
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reloaded routes rejected, keeping current table");
                    }
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
