//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! http (request span with request_id)
//!     → proxy pipeline (stage traces, error events)
//!     → logging.rs (EnvFilter + fmt subscriber → stdout)
//!
//! pool guards, pipeline outcomes
//!     → metrics.rs (`metrics` facade)
//!     → Prometheus recorder → scrape endpoint
//! ```
//!
//! # Design Decisions
//! - With no recorder installed metric calls are no-ops, so tests and
//!   embedders need no exporter
//! - `RUST_LOG` overrides the configured log level

pub mod logging;
pub mod metrics;
