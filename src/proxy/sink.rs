//! Response sinks.
//!
//! A sink is where the pipeline writes the caller's response. The status is
//! committed at most once: either explicitly through `write_head` (the error
//! hook does this) or implicitly by the first body chunk.

use std::io;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;

/// Destination of a proxied response.
#[async_trait]
pub trait ResponseSink: Send {
    /// True once a status has been sent.
    fn is_committed(&self) -> bool;

    /// Send the status. Fails with `AlreadyExists` after a commit.
    async fn write_head(&mut self, status: StatusCode) -> io::Result<()>;

    /// Send a body chunk, committing `200 OK` first if needed.
    async fn write_chunk(&mut self, chunk: Bytes) -> io::Result<()>;

    /// Finish a successful response. Commits `200 OK` for empty bodies.
    async fn finish(&mut self) -> io::Result<()> {
        if !self.is_committed() {
            self.write_head(StatusCode::OK).await?;
        }
        Ok(())
    }
}

pub(crate) fn already_committed() -> io::Error {
    io::Error::new(io::ErrorKind::AlreadyExists, "response head already sent")
}

/// In-memory sink, for embedding the pipeline outside of an HTTP server.
///
/// `fail_after` makes body writes fail once that many bytes were accepted,
/// which is how a disconnecting caller looks to the relay.
#[derive(Debug, Default, Clone)]
pub struct BufferedSink {
    pub status: Option<StatusCode>,
    pub body: Vec<u8>,
    pub head_writes: usize,
    pub fail_after: Option<usize>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(bytes: usize) -> Self {
        Self {
            fail_after: Some(bytes),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ResponseSink for BufferedSink {
    fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    async fn write_head(&mut self, status: StatusCode) -> io::Result<()> {
        if self.status.is_some() {
            return Err(already_committed());
        }
        self.status = Some(status);
        self.head_writes += 1;
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        if !self.is_committed() {
            self.write_head(StatusCode::OK).await?;
        }
        if let Some(limit) = self.fail_after {
            if self.body.len() + chunk.len() > limit {
                let room = limit.saturating_sub(self.body.len());
                self.body.extend_from_slice(&chunk[..room]);
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "caller went away"));
            }
        }
        self.body.extend_from_slice(&chunk);
        Ok(())
    }
}
