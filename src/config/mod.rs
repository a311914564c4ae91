//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! proxy.toml
//!     → loader.rs      toml → ProxyConfig (serde defaults fill gaps)
//!     → validation.rs  every semantic error collected, not just the first
//!     → loader.rs      schema `path`s read and inlined as `source`
//!     → lifecycle::startup compiles routes, pools, pipeline
//!
//! watcher.rs (config directory changed, debounced)
//!     → loader.rs again
//!     → lifecycle::startup::apply_reloads → SharedRouteTable swap
//! ```
//!
//! # Design Decisions
//! - A loaded ProxyConfig is a value; reload produces a new one
//! - Only routes and schemas are hot-reloaded; pools and pipeline options are fixed at startup
//! - Every section has defaults, so a schema plus a default route is a complete config

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{
    DefaultRouteConfig, ListenerConfig, ObservabilityConfig, PipelineConfig, PoolConfig,
    ProxyConfig, RouteConfig, SchemaConfig, TimeoutConfig,
};
