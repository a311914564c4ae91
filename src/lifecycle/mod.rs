//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! startup.rs:
//!     validated ProxyConfig → RouteTable → SharedRouteTable
//!                           → ProxyPools + HttpTransport → Arc<Proxy>
//!     watcher updates → apply_reloads → SharedRouteTable::store
//!
//! signals.rs → shutdown.rs:
//!     SIGINT / SIGTERM → Shutdown::trigger → broadcast
//!         → HttpServer stops accepting, drains in-flight pipelines
//!         → reload loop exits
//! ```
//!
//! # Design Decisions
//! - Wiring is a plain function returning the pieces, not a global registry
//! - Pools and options are fixed for the life of the process; routes are not

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{apply_reloads, build_proxy, StartupError};
