//! Injectable hooks: error reporting and response rewriting.

use async_trait::async_trait;
use bytes::Bytes;

use crate::proxy::{ProxyError, ResponseSink};

/// The single point where a pipeline error becomes visible to the caller.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle(&self, error: &ProxyError, sink: &mut dyn ResponseSink);
}

/// Logs the error and, if the response is not committed yet, answers with
/// the error's status and text.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorHandler;

#[async_trait]
impl ErrorHandler for DefaultErrorHandler {
    async fn handle(&self, error: &ProxyError, sink: &mut dyn ResponseSink) {
        tracing::error!(
            kind = error.kind(),
            stage = %error.stage(),
            error = %error,
            "Proxy request failed"
        );

        if sink.is_committed() {
            // Partial body already reached the caller; nothing to retract.
            tracing::warn!(kind = error.kind(), "Response already committed, body truncated");
            return;
        }

        if let Err(e) = sink.write_head(error.status()).await {
            tracing::debug!(error = %e, "Could not write error status");
            return;
        }
        if let Err(e) = sink.write_chunk(Bytes::from(error.to_string())).await {
            tracing::debug!(error = %e, "Could not write error body");
        }
    }
}

/// Extension point for rewriting backend responses on their way back.
pub trait ResponseHook: Send + Sync {
    fn on_chunk(&self, chunk: Bytes) -> Bytes;
}

/// Relays backend bytes unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResponse;

impl ResponseHook for IdentityResponse {
    #[inline]
    fn on_chunk(&self, chunk: Bytes) -> Bytes {
        chunk
    }
}
