//! Resource pooling subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → object_pool.rs (acquire: pop idle item or build a new one, reset it)
//!     → Pooled<T> guard owned by the pipeline for one request
//!     → reader.rs (StreamReader re-targeted: inbound body, then backend body)
//!     → guard dropped on every exit path → item back on the idle list
//! ```
//!
//! # Design Decisions
//! - Pools are explicit values handed to the pipeline, never process globals
//! - Reset happens on acquire, so a stale item can never leak request state
//! - Release is tied to `Drop`; a guard can only release once
//! - Idle lists are bounded; surplus items are discarded and counted

pub mod object_pool;
pub mod reader;

pub use object_pool::{Pool, PoolStats, Pooled, Reset};
pub use reader::{BodyStream, StreamReader};

use bytes::BytesMut;

impl Reset for BytesMut {
    fn reset(&mut self) {
        self.clear();
    }
}

/// Pool of accumulation buffers that hold the rewritten query.
pub type BufferPool = Pool<BytesMut>;

/// Pool of buffered stream readers.
pub type ReaderPool = Pool<StreamReader>;

/// Build a buffer pool whose fresh buffers start with `capacity` bytes.
pub fn buffer_pool(max_idle: usize, capacity: usize) -> BufferPool {
    Pool::new("buffer", max_idle, move || BytesMut::with_capacity(capacity))
}

/// Build a reader pool whose readers coalesce up to `capacity` bytes per chunk.
pub fn reader_pool(max_idle: usize, capacity: usize) -> ReaderPool {
    Pool::new("reader", max_idle, move || StreamReader::with_capacity(capacity))
}
