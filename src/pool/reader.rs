//! Pooled buffered reader over body streams.
//!
//! A `StreamReader` is attached to one body at a time. The pipeline first
//! attaches it to the inbound request body to drain the envelope, then
//! re-targets it at the backend response to relay chunks to the caller.
//! Detaching (or re-attaching) drops the previous stream, which closes it.

use std::io;

use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};

use crate::pool::Reset;

/// A body as a stream of byte chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// Resettable buffered reader.
pub struct StreamReader {
    source: Option<BodyStream>,
    staging: BytesMut,
    capacity: usize,
    pending_error: Option<io::Error>,
    exhausted: bool,
}

impl StreamReader {
    /// Create a detached reader that coalesces up to `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            source: None,
            staging: BytesMut::with_capacity(capacity),
            capacity: capacity.max(1),
            pending_error: None,
            exhausted: false,
        }
    }

    /// Point the reader at a new stream, closing the previous one.
    pub fn attach(&mut self, source: BodyStream) {
        self.clear_state();
        self.source = Some(source);
    }

    /// Take the current stream out of the reader.
    pub fn detach(&mut self) -> Option<BodyStream> {
        self.clear_state();
        self.source.take()
    }

    fn clear_state(&mut self) {
        self.staging.clear();
        self.pending_error = None;
        self.exhausted = false;
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }

    /// Drain the attached stream and return everything it produced.
    ///
    /// Fails with `InvalidData` once more than `limit` bytes arrive and with
    /// `NotConnected` when no stream is attached.
    pub async fn read_to_end(&mut self, limit: usize) -> io::Result<&[u8]> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "reader is not attached"))?;

        self.staging.clear();
        while let Some(chunk) = source.next().await {
            let chunk = chunk?;
            if self.staging.len() + chunk.len() > limit {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("body exceeds {} bytes", limit),
                ));
            }
            self.staging.extend_from_slice(&chunk);
        }
        Ok(&self.staging[..])
    }

    /// Next chunk of the attached stream, or `None` at end of stream.
    ///
    /// Waits for at most one upstream chunk. Chunks that are already ready
    /// behind it are joined up to the reader capacity; nothing is held back
    /// waiting for more data. An upstream error is reported after the bytes
    /// received before it.
    pub async fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        if let Some(e) = self.pending_error.take() {
            return Some(Err(e));
        }
        if self.exhausted {
            return None;
        }
        let source = match self.source.as_mut() {
            Some(source) => source,
            None => {
                return Some(Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "reader is not attached",
                )))
            }
        };

        let first = match source.next().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Some(Err(e)),
            None => {
                self.exhausted = true;
                return None;
            }
        };
        if first.len() >= self.capacity {
            return Some(Ok(first));
        }

        self.staging.clear();
        self.staging.extend_from_slice(&first);
        while self.staging.len() < self.capacity {
            match source.next().now_or_never() {
                Some(Some(Ok(chunk))) => self.staging.extend_from_slice(&chunk),
                Some(Some(Err(e))) => {
                    self.pending_error = Some(e);
                    break;
                }
                Some(None) => {
                    self.exhausted = true;
                    break;
                }
                None => break,
            }
        }
        Some(Ok(self.staging.split().freeze()))
    }
}

impl Reset for StreamReader {
    fn reset(&mut self) {
        self.source = None;
        self.clear_state();
        if self.staging.capacity() < self.capacity {
            self.staging.reserve(self.capacity);
        }
    }
}

impl std::fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamReader")
            .field("attached", &self.is_attached())
            .field("staged", &self.staging.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
