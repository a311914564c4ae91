//! Proxy pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound body + ContextValues + route key
//!     → pipeline.rs ACQUIRE (buffer + reader from pools)
//!     → pipeline.rs ACCEPT  (config → invoker → envelope.rs decode → rewrite into buffer)
//!     → pipeline.rs DISPATCH (envelope.rs encode → upstream transport)
//!     → pipeline.rs RELAY   (reader re-targeted at backend body → hooks.rs → sink.rs)
//!     → pipeline.rs RELEASE (streams closed, items returned)
//!     → on failure: hooks.rs ErrorHandler
//! ```
//!
//! # Design Decisions
//! - Scoped acquisition: pool guards release on drop, never per branch
//! - At most one status write per response (see `ResponseSink`)
//! - No retries: a rewrite either succeeds or the request fails
//! - Partial responses after a relay failure are expected, not corruption

pub mod envelope;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod sink;

pub use envelope::{Envelope, OutboundEnvelope, JSON_CONTENT_TYPE};
pub use error::{ProxyError, Stage};
pub use hooks::{DefaultErrorHandler, ErrorHandler, IdentityResponse, ResponseHook};
pub use pipeline::{Proxy, ProxyBuilder, ProxyOptions, ProxyPools};
pub use sink::{BufferedSink, ResponseSink};
