//! Backend transport subsystem.
//!
//! # Data Flow
//! ```text
//! Encoded outbound envelope (Bytes)
//!     → client.rs (POST to RequestConfig.backend_url, fixed JSON content type)
//!     → hyper-util pooled connection
//!     → response body as BodyStream (status is not inspected)
//! ```
//!
//! # Design Decisions
//! - One request per dispatch; no retries, no load balancing
//! - The caller owns the returned stream and closes it by dropping it

pub mod client;

pub use client::{HttpTransport, Transport, TransportError};
