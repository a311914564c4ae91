//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler on every path and method
//! - Wire up middleware (request ID, tracing, timeout)
//! - Turn each request into a pipeline run on its own task
//! - Bind server to listener and shut down gracefully

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    response::Response,
    routing::any,
    Router,
};
use futures_util::{StreamExt, TryStreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::http::request::{
    propagate_request_id_layer, request_span, set_request_id_layer, RequestIdExt,
};
use crate::http::response::ChannelSink;
use crate::middleware::ContextValues;
use crate::pool::BodyStream;
use crate::proxy::Proxy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<Proxy>,
    pub context_headers: Arc<[HeaderName]>,
    pub response_buffer: usize,
}

/// HTTP server for the query proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around a built pipeline.
    pub fn new(config: &ProxyConfig, proxy: Arc<Proxy>) -> Self {
        let context_headers = config
            .pipeline
            .context_headers
            .iter()
            .filter_map(|name| match HeaderName::from_bytes(name.as_bytes()) {
                Ok(header) => Some(header),
                Err(_) => {
                    tracing::warn!(header = %name, "Ignoring invalid context header");
                    None
                }
            })
            .collect();

        let state = AppState {
            proxy,
            context_headers,
            response_buffer: config.pipeline.response_channel_capacity,
        };

        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(request_span::<Body>))
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
///
/// The raw request target is the route key. The pipeline runs on a spawned
/// task writing into a `ChannelSink`; this handler returns as soon as the
/// status is known and the body streams behind it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let route_key = request
        .uri()
        .path_and_query()
        .map(|target| target.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let context = ContextValues::from_headers(request.headers(), &state.context_headers);

    tracing::debug!(
        request_id = request.request_id().unwrap_or("unknown"),
        route = %route_key,
        "Proxying request"
    );

    let body: BodyStream = request
        .into_body()
        .into_data_stream()
        .map_err(io::Error::other)
        .boxed();

    let (mut sink, pending) = ChannelSink::new(state.response_buffer);
    let proxy = Arc::clone(&state.proxy);

    tokio::spawn(
        async move {
            let result = proxy.serve(context, &route_key, body, &mut sink).await;
            if let Err(error) = result {
                // A success status already went out; cut the body short.
                if sink.status().is_some_and(|status| status.is_success()) {
                    sink.abort(error.to_string()).await;
                }
            }
        }
        .instrument(tracing::Span::current()),
    );

    pending.into_response().await
}
