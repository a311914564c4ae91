//! Query Proxy Library
//!
//! An HTTP proxy that accepts JSON query envelopes, rewrites the query
//! through a pluggable middleware chain and streams the backend's response
//! back to the caller, drawing every per-request resource from pools.

// Core subsystems
pub mod config;
pub mod http;
pub mod middleware;
pub mod pool;
pub mod proxy;
pub mod routing;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{Proxy, ProxyError};
