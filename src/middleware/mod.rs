//! Query middleware subsystem.
//!
//! # Data Flow
//! ```text
//! RequestConfig.schema
//!     → invoker.rs (set_schema on a pooled Invoker)
//!     → invoker.rs (invoke with ContextValues + raw query)
//!         → chain.rs (each QueryMiddleware rewrites or rejects the query)
//!     → invoker.rs (write_rewritten into the request buffer)
//! ```
//!
//! # Design Decisions
//! - The pipeline only sees the `Invoker` capability set
//! - Invokers are pooled; `reset` wipes schema and query on checkout
//! - A schema must be set before every invocation

pub mod chain;
pub mod context;
pub mod invoker;
pub mod schema;

pub use chain::{MiddlewareChain, MiddlewareError, QueryMiddleware};
pub use context::ContextValues;
pub use invoker::{invoker_pool, Invoker, InvokerError, InvokerPool};
pub use schema::{Schema, SchemaHandle};
