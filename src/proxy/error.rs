//! Pipeline error taxonomy.

use std::io;

use axum::http::StatusCode;
use thiserror::Error;

use crate::middleware::InvokerError;

/// Pipeline state a request was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquire,
    Accept,
    Dispatch,
    Relay,
    Release,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Accept => "accept",
            Stage::Dispatch => "dispatch",
            Stage::Relay => "relay",
            Stage::Release => "release",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that end a proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No route config, or the route's schema could not be set.
    #[error("config error: {0}")]
    Config(String),

    /// The inbound body could not be read or is not a valid envelope.
    #[error("decode error: {0}")]
    Decode(String),

    /// The middleware chain rejected or failed to transform the query.
    #[error("rewrite error: {0}")]
    Rewrite(#[source] InvokerError),

    /// Encoding or sending the outbound request failed.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Streaming the backend response to the caller failed. Bytes already
    /// written stay written.
    #[error("relay error: {0}")]
    Relay(#[source] io::Error),
}

impl ProxyError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Config(_) => "config",
            ProxyError::Decode(_) => "decode",
            ProxyError::Rewrite(_) => "rewrite",
            ProxyError::Dispatch(_) => "dispatch",
            ProxyError::Relay(_) => "relay",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ProxyError::Config(_) | ProxyError::Decode(_) | ProxyError::Rewrite(_) => Stage::Accept,
            ProxyError::Dispatch(_) => Stage::Dispatch,
            ProxyError::Relay(_) => Stage::Relay,
        }
    }

    /// Status reported to the caller when nothing has been written yet.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Dispatch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
