//! HTTP transport to the backend.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::config::TimeoutConfig;
use crate::pool::BodyStream;

/// Errors talking to the backend.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid backend request: {0}")]
    InvalidRequest(#[from] axum::http::Error),

    #[error("backend request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),
}

/// Generic request/response client to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `payload` to `url` and return the response body.
    async fn post(
        &self,
        url: &Url,
        content_type: &'static str,
        payload: Bytes,
    ) -> Result<BodyStream, TransportError>;
}

/// hyper-util backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &Url,
        content_type: &'static str,
        payload: Bytes,
    ) -> Result<BodyStream, TransportError> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(payload))?;

        let response = tokio::time::timeout(self.request_timeout, self.client.request(request))
            .await
            .map_err(|_| TransportError::Timeout(self.request_timeout))??;

        tracing::debug!(
            backend = %url,
            status = %response.status(),
            "Backend responded"
        );

        let body = Body::new(response.into_body())
            .into_data_stream()
            .map_err(io::Error::other)
            .boxed();
        Ok(body)
    }
}
