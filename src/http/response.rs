//! Streaming responses.
//!
//! # Responsibilities
//! - Bridge the pipeline task's `ResponseSink` writes to an axum `Response`
//! - Commit the status exactly once
//! - Stream body chunks as they arrive
//!
//! # Design Decisions
//! - The status travels on a oneshot; body chunks on a bounded mpsc, so a
//!   slow client applies backpressure to the relay
//! - A sink dropped without a status becomes a 500
//! - A failure after the status was sent aborts the body, so the client
//!   sees a truncated response instead of a clean end

use std::io;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use crate::proxy::sink::already_committed;
use crate::proxy::{ResponseSink, JSON_CONTENT_TYPE};

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

type Chunk = Result<Bytes, io::Error>;

/// Sink half, owned by the pipeline task.
#[derive(Debug)]
pub struct ChannelSink {
    head: Option<oneshot::Sender<StatusCode>>,
    status: Option<StatusCode>,
    body: mpsc::Sender<Chunk>,
}

/// Response half, awaited by the handler.
#[derive(Debug)]
pub struct PendingResponse {
    head: oneshot::Receiver<StatusCode>,
    body: mpsc::Receiver<Chunk>,
}

impl ChannelSink {
    /// Create a connected sink/response pair buffering up to `capacity` chunks.
    pub fn new(capacity: usize) -> (ChannelSink, PendingResponse) {
        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(capacity.max(1));
        (
            ChannelSink {
                head: Some(head_tx),
                status: None,
                body: body_tx,
            },
            PendingResponse {
                head: head_rx,
                body: body_rx,
            },
        )
    }

    /// Status sent to the client, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Terminate a committed body with an error.
    pub async fn abort(&mut self, reason: impl Into<String>) {
        let error = io::Error::new(io::ErrorKind::ConnectionAborted, reason.into());
        let _ = self.body.send(Err(error)).await;
    }
}

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

#[async_trait]
impl ResponseSink for ChannelSink {
    fn is_committed(&self) -> bool {
        self.head.is_none()
    }

    async fn write_head(&mut self, status: StatusCode) -> io::Result<()> {
        let head = self.head.take().ok_or_else(already_committed)?;
        self.status = Some(status);
        head.send(status).map_err(|_| disconnected())
    }

    async fn write_chunk(&mut self, chunk: Bytes) -> io::Result<()> {
        if !self.is_committed() {
            self.write_head(StatusCode::OK).await?;
        }
        self.body.send(Ok(chunk)).await.map_err(|_| disconnected())
    }
}

impl PendingResponse {
    /// Wait for the status, then stream the body.
    pub async fn into_response(self) -> Response {
        let status = match self.head.await {
            Ok(status) => status,
            Err(_) => {
                tracing::error!("Pipeline finished without a response");
                return (StatusCode::INTERNAL_SERVER_ERROR, "no response").into_response();
            }
        };

        let content_type = if status.is_success() {
            JSON_CONTENT_TYPE
        } else {
            TEXT_CONTENT_TYPE
        };

        let chunks = futures_util::stream::unfold(self.body, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });

        let mut response = Response::new(Body::from_stream(chunks));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }
}
