//! Request config resolution.
//!
//! # Data Flow
//! ```text
//! Inbound request target ("/graphql?x=1")
//!     → matcher.rs (exact key, then path without query)
//!     → router.rs (RouteTable lookup, fall back to default route)
//!     → RequestConfig { schema, backend_url }
//!
//! Dispatch:
//!     no route key → default route (global backend target)
//!
//! Config reload:
//!     ProxyConfig → RouteTable::from_config → SharedRouteTable::store (atomic swap)
//! ```
//!
//! # Design Decisions
//! - Tables are compiled once and immutable; reload swaps the whole table
//! - Lookups are lock-free (`arc-swap`) and safe from any number of tasks
//! - Deterministic: the same key always resolves to the same config

pub mod matcher;
pub mod router;

pub use router::{RequestConfig, RequestConfigProvider, RouteTable, RouteTableError, SharedRouteTable};
