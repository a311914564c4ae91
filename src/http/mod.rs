//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (request ID, request span)
//!     → handler: route key + context values + body stream
//!     → spawned task: proxy::Proxy::serve
//!     → response.rs (ChannelSink → PendingResponse → streaming body)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - The pipeline runs on its own task; the handler only waits for the status
//! - Response bodies stream through a bounded channel, never buffered whole

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{ChannelSink, PendingResponse};
pub use server::{AppState, HttpServer};
