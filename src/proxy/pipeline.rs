//! Request/response pipeline.
//!
//! # States
//! ```text
//! ACQUIRE → ACCEPT → DISPATCH → RELAY → RELEASE
//!              │         │         │
//!              └─────────┴─────────┴──→ RELEASE → error hook
//! ```
//!
//! Buffer and reader are pool guards owned by `serve`; the invoker guard is
//! owned by `accept_request`. Guards release on drop, so every exit path
//! returns every item exactly once. Streams are closed by dropping them: the
//! inbound body when the reader is re-targeted at the backend response, the
//! backend response when the reader is detached in RELEASE.

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};

use crate::config::{PipelineConfig, PoolConfig, TimeoutConfig};
use crate::middleware::{
    invoker_pool, ContextValues, Invoker, InvokerPool, MiddlewareChain, QueryMiddleware,
};
use crate::observability::metrics;
use crate::pool::{buffer_pool, reader_pool, BodyStream, BufferPool, ReaderPool, StreamReader};
use crate::proxy::envelope::{Envelope, OutboundEnvelope, JSON_CONTENT_TYPE};
use crate::proxy::hooks::{DefaultErrorHandler, ErrorHandler, IdentityResponse, ResponseHook};
use crate::proxy::{ProxyError, ResponseSink, Stage};
use crate::routing::RequestConfigProvider;
use crate::upstream::{HttpTransport, Transport};

/// Behavior switches for the pipeline.
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    /// Largest inbound body accepted, in bytes.
    pub max_body_bytes: usize,
    /// Copy the inbound operation name into the outbound envelope.
    pub forward_operation_name: bool,
    /// Resolve the backend with the inbound route key instead of the default route.
    pub route_scoped_dispatch: bool,
    /// Send dispatch failures through the error hook.
    pub report_dispatch_errors: bool,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for ProxyOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
            forward_operation_name: config.forward_operation_name,
            route_scoped_dispatch: config.route_scoped_dispatch,
            report_dispatch_errors: config.report_dispatch_errors,
        }
    }
}

/// The pools a pipeline draws from. Cloning shares the same pools.
#[derive(Debug, Clone)]
pub struct ProxyPools {
    pub buffers: BufferPool,
    pub readers: ReaderPool,
    pub invokers: InvokerPool,
}

impl ProxyPools {
    pub fn new<F>(config: &PoolConfig, invoker_factory: F) -> Self
    where
        F: Fn() -> Box<dyn Invoker> + Send + Sync + 'static,
    {
        Self {
            buffers: buffer_pool(config.max_idle, config.buffer_capacity),
            readers: reader_pool(config.max_idle, config.reader_capacity),
            invokers: invoker_pool(config.max_idle, invoker_factory),
        }
    }

    /// Pools whose invokers run `steps` as a [`MiddlewareChain`].
    pub fn with_chain(config: &PoolConfig, steps: Vec<Arc<dyn QueryMiddleware>>) -> Self {
        let steps: Arc<[Arc<dyn QueryMiddleware>]> = steps.into();
        Self::new(config, move || -> Box<dyn Invoker> {
            Box::new(MiddlewareChain::new(Arc::clone(&steps)))
        })
    }

    /// Items checked out across all pools.
    pub fn outstanding(&self) -> u64 {
        self.buffers.stats().outstanding
            + self.readers.stats().outstanding
            + self.invokers.stats().outstanding
    }
}

/// The query proxy.
pub struct Proxy {
    provider: Arc<dyn RequestConfigProvider>,
    pools: ProxyPools,
    transport: Arc<dyn Transport>,
    on_error: Arc<dyn ErrorHandler>,
    response_hook: Arc<dyn ResponseHook>,
    options: ProxyOptions,
}

impl Proxy {
    pub fn builder(provider: Arc<dyn RequestConfigProvider>, pools: ProxyPools) -> ProxyBuilder {
        ProxyBuilder {
            provider,
            pools,
            transport: None,
            on_error: None,
            response_hook: None,
            options: ProxyOptions::default(),
        }
    }

    pub fn pools(&self) -> &ProxyPools {
        &self.pools
    }

    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    /// Handle one request end to end.
    ///
    /// Errors are returned after they went through the error hook (or were
    /// deliberately not reported, for dispatch failures with
    /// `report_dispatch_errors` off). All pooled items are back in their
    /// pools by the time this returns.
    pub async fn serve(
        &self,
        context: ContextValues,
        route_key: &str,
        body: BodyStream,
        sink: &mut dyn ResponseSink,
    ) -> Result<u64, ProxyError> {
        let started = Instant::now();

        tracing::trace!(stage = %Stage::Acquire, route = route_key, "Pipeline stage");
        let mut buffer = self.pools.buffers.acquire();
        let mut reader = self.pools.readers.acquire();
        reader.attach(body);

        let result = self
            .run(&context, route_key, &mut reader, &mut buffer, sink)
            .await;

        tracing::trace!(stage = %Stage::Release, route = route_key, "Pipeline stage");
        drop(reader.detach());
        drop(reader);
        drop(buffer);

        match result {
            Ok(relayed) => {
                metrics::record_request("ok", StatusCode::OK.as_u16(), started);
                metrics::record_relayed_bytes(relayed);
                tracing::debug!(route = route_key, relayed_bytes = relayed, "Request proxied");
                Ok(relayed)
            }
            Err(error) => {
                let report = !matches!(error, ProxyError::Dispatch(_))
                    || self.options.report_dispatch_errors;
                if report {
                    self.on_error.handle(&error, sink).await;
                } else {
                    tracing::debug!(route = route_key, error = %error, "Dispatch failed, not reported");
                }
                metrics::record_request(error.kind(), error.status().as_u16(), started);
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        context: &ContextValues,
        route_key: &str,
        reader: &mut StreamReader,
        buffer: &mut BytesMut,
        sink: &mut dyn ResponseSink,
    ) -> Result<u64, ProxyError> {
        tracing::trace!(stage = %Stage::Accept, route = route_key, "Pipeline stage");
        let operation_name = self
            .accept_request(context, Some(route_key), reader, buffer)
            .await?;

        tracing::trace!(stage = %Stage::Dispatch, route = route_key, "Pipeline stage");
        let response = self
            .dispatch_request(Some(route_key), &operation_name, &buffer[..])
            .await?;

        tracing::trace!(stage = %Stage::Relay, route = route_key, "Pipeline stage");
        reader.attach(response);
        self.relay_response(reader, sink).await
    }

    /// Decode the inbound envelope from `reader`, run the middleware chain
    /// and write the rewritten query into `buffer`.
    ///
    /// Returns the inbound operation name. No network I/O happens here.
    pub async fn accept_request(
        &self,
        context: &ContextValues,
        route_key: Option<&str>,
        reader: &mut StreamReader,
        buffer: &mut BytesMut,
    ) -> Result<String, ProxyError> {
        let config = self.provider.request_config(route_key).ok_or_else(|| {
            ProxyError::Config(format!("no route config for '{}'", route_key.unwrap_or("<default>")))
        })?;

        // Released when this function returns, on every path.
        let mut invoker = self.pools.invokers.acquire();
        invoker
            .set_schema(Arc::clone(&config.schema))
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        let body = reader
            .read_to_end(self.options.max_body_bytes)
            .await
            .map_err(|e| ProxyError::Decode(e.to_string()))?;
        let envelope = Envelope::decode(body).map_err(|e| ProxyError::Decode(e.to_string()))?;

        invoker
            .invoke(context, envelope.query.as_bytes())
            .map_err(ProxyError::Rewrite)?;
        invoker.write_rewritten(buffer).map_err(ProxyError::Rewrite)?;

        Ok(envelope.operation_name)
    }

    /// Wrap the rewritten query in a fresh envelope and POST it to the backend.
    pub async fn dispatch_request(
        &self,
        route_key: Option<&str>,
        operation_name: &str,
        rewritten: &[u8],
    ) -> Result<BodyStream, ProxyError> {
        let query = std::str::from_utf8(rewritten)
            .map_err(|e| ProxyError::Dispatch(format!("rewritten query is not UTF-8: {}", e)))?;
        let outbound = OutboundEnvelope {
            operation_name: if self.options.forward_operation_name { operation_name } else { "" },
            query,
        };
        let payload = outbound
            .encode()
            .map_err(|e| ProxyError::Dispatch(format!("encoding outbound envelope: {}", e)))?;

        let dispatch_key = if self.options.route_scoped_dispatch { route_key } else { None };
        let config = self.provider.request_config(dispatch_key).ok_or_else(|| {
            ProxyError::Dispatch(format!(
                "no backend configured for '{}'",
                dispatch_key.unwrap_or("<default>")
            ))
        })?;

        self.transport
            .post(&config.backend_url, JSON_CONTENT_TYPE, Bytes::from(payload))
            .await
            .map_err(|e| ProxyError::Dispatch(e.to_string()))
    }

    /// Stream the backend body from `reader` to `sink` through the response hook.
    pub async fn relay_response(
        &self,
        reader: &mut StreamReader,
        sink: &mut dyn ResponseSink,
    ) -> Result<u64, ProxyError> {
        let mut relayed = 0u64;
        while let Some(chunk) = reader.next_chunk().await {
            let chunk = self.response_hook.on_chunk(chunk.map_err(ProxyError::Relay)?);
            let len = chunk.len() as u64;
            sink.write_chunk(chunk).await.map_err(ProxyError::Relay)?;
            relayed += len;
        }
        sink.finish().await.map_err(ProxyError::Relay)?;
        Ok(relayed)
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("pools", &self.pools)
            .field("options", &self.options)
            .finish()
    }
}

/// Builder for [`Proxy`].
pub struct ProxyBuilder {
    provider: Arc<dyn RequestConfigProvider>,
    pools: ProxyPools,
    transport: Option<Arc<dyn Transport>>,
    on_error: Option<Arc<dyn ErrorHandler>>,
    response_hook: Option<Arc<dyn ResponseHook>>,
    options: ProxyOptions,
}

impl ProxyBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.on_error = Some(handler);
        self
    }

    pub fn response_hook(mut self, hook: Arc<dyn ResponseHook>) -> Self {
        self.response_hook = Some(hook);
        self
    }

    pub fn options(mut self, options: ProxyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Proxy {
        Proxy {
            provider: self.provider,
            pools: self.pools,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HttpTransport::new(&TimeoutConfig::default()))),
            on_error: self.on_error.unwrap_or_else(|| Arc::new(DefaultErrorHandler)),
            response_hook: self.response_hook.unwrap_or_else(|| Arc::new(IdentityResponse)),
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::{stream, StreamExt};
    use parking_lot::Mutex;
    use url::Url;

    use crate::middleware::{MiddlewareError, Schema};
    use crate::proxy::BufferedSink;
    use crate::routing::{RequestConfig, RouteTable};
    use crate::upstream::TransportError;

    const BACKEND_BODY: &[u8] = br#"{"data": {"field": 42}}"#;

    /// Records every dispatch and answers with a canned body or a failure.
    #[derive(Default)]
    struct MockTransport {
        requests: Mutex<Vec<(Url, Bytes)>>,
        fail: bool,
        reply: Option<fn() -> BodyStream>,
    }

    impl MockTransport {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn replying(reply: fn() -> BodyStream) -> Self {
            Self {
                reply: Some(reply),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().len()
        }

        fn last_envelope(&self) -> serde_json::Value {
            let requests = self.requests.lock();
            let (_, payload) = requests.last().expect("no dispatch recorded");
            serde_json::from_slice(payload).unwrap()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post(
            &self,
            url: &Url,
            content_type: &'static str,
            payload: Bytes,
        ) -> Result<BodyStream, TransportError> {
            assert_eq!(content_type, "application/json");
            self.requests.lock().push((url.clone(), payload));
            if self.fail {
                return Err(TransportError::Timeout(std::time::Duration::from_millis(1)));
            }
            if let Some(reply) = self.reply {
                return Ok(reply());
            }
            // Split the body to exercise chunked relay.
            let (a, b) = BACKEND_BODY.split_at(7);
            let chunks: Vec<io::Result<Bytes>> = vec![Ok(Bytes::from_static(a)), Ok(Bytes::from_static(b))];
            Ok(stream::iter(chunks).boxed())
        }
    }

    /// Counts hook invocations, then behaves like the default handler.
    #[derive(Default)]
    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ErrorHandler for CountingHandler {
        async fn handle(&self, error: &ProxyError, sink: &mut dyn ResponseSink) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            DefaultErrorHandler.handle(error, sink).await;
        }
    }

    /// Uppercases the query and tags it with the schema it ran against.
    struct Shout;

    impl QueryMiddleware for Shout {
        fn name(&self) -> &str {
            "shout"
        }

        fn on_request(
            &self,
            _context: &ContextValues,
            schema: &Schema,
            query: &mut String,
        ) -> Result<(), MiddlewareError> {
            if query.contains("forbidden") {
                return Err(MiddlewareError::new(self.name(), "forbidden field"));
            }
            *query = format!("{} #{}", query.to_uppercase(), schema.name());
            Ok(())
        }
    }

    fn request_config(schema: &str, source: &str, port: u16) -> RequestConfig {
        RequestConfig {
            schema: Schema::new(schema, source).into_handle(),
            backend_url: Url::parse(&format!("http://127.0.0.1:{}/graphql", port)).unwrap(),
        }
    }

    fn table() -> RouteTable {
        let mut routes = HashMap::new();
        routes.insert("/admin".to_string(), request_config("admin", "type Query { b: Int }", 4001));
        routes.insert("/broken".to_string(), request_config("broken", "", 4002));
        RouteTable::new(routes, Some(request_config("main", "type Query { a: Int }", 4000)))
    }

    fn pool_config(max_idle: usize) -> PoolConfig {
        PoolConfig {
            max_idle,
            ..PoolConfig::default()
        }
    }

    struct Harness {
        proxy: Proxy,
        transport: Arc<MockTransport>,
        handler: Arc<CountingHandler>,
    }

    fn harness(transport: MockTransport, options: ProxyOptions) -> Harness {
        let transport = Arc::new(transport);
        let handler = Arc::new(CountingHandler::default());
        let pools = ProxyPools::with_chain(&pool_config(1), vec![Arc::new(Shout)]);
        let proxy = Proxy::builder(Arc::new(table()), pools)
            .transport(transport.clone())
            .error_handler(handler.clone())
            .options(options)
            .build();
        Harness { proxy, transport, handler }
    }

    fn body(bytes: &'static [u8]) -> BodyStream {
        stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(bytes))]).boxed()
    }

    fn user(name: &'static str) -> ContextValues {
        ContextValues::new().with("user", name)
    }

    #[tokio::test]
    async fn rewritten_query_reaches_backend() {
        let h = harness(MockTransport::default(), ProxyOptions::default());
        let mut sink = BufferedSink::new();

        let relayed = h
            .proxy
            .serve(user("alice"), "/graphql", body(br#"{"operationName":"Q","query":"query Q { a }"}"#), &mut sink)
            .await
            .unwrap();

        let sent = h.transport.last_envelope();
        assert_eq!(sent["query"], "QUERY Q { A } #main");
        assert_eq!(sent["operationName"], "");
        assert_eq!(relayed, BACKEND_BODY.len() as u64);
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn relays_backend_body_verbatim() {
        let h = harness(MockTransport::default(), ProxyOptions::default());
        let mut sink = BufferedSink::new();

        h.proxy
            .serve(user("alice"), "/graphql", body(br#"{"query":"{ a }"}"#), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.status, Some(StatusCode::OK));
        assert_eq!(sink.body, BACKEND_BODY);
        assert_eq!(sink.head_writes, 1);
    }

    #[tokio::test]
    async fn every_failure_path_returns_pooled_items() {
        let cases: Vec<(&str, &'static [u8], bool, &str)> = vec![
            ("/broken", br#"{"query":"{ a }"}"#, false, "config"),
            ("/graphql", br#"{"query":"{ a }""#, false, "decode"),
            ("/graphql", br#"{"query":"{ forbidden }"}"#, false, "rewrite"),
            ("/graphql", br#"{"query":"{ a }"}"#, true, "dispatch"),
        ];

        for (route, payload, fail_transport, kind) in cases {
            let transport = if fail_transport { MockTransport::failing() } else { MockTransport::default() };
            let h = harness(transport, ProxyOptions::default());
            let mut sink = BufferedSink::new();

            let err = h
                .proxy
                .serve(user("bob"), route, body(payload), &mut sink)
                .await
                .unwrap_err();

            assert_eq!(err.kind(), kind);
            assert_eq!(h.proxy.pools().outstanding(), 0, "leak after {} failure", kind);
            let pools = h.proxy.pools();
            assert_eq!(pools.buffers.stats().released, 1);
            assert_eq!(pools.readers.stats().released, 1);
        }
    }

    #[tokio::test]
    async fn relay_failure_keeps_partial_body_and_releases() {
        let h = harness(MockTransport::default(), ProxyOptions::default());
        let mut sink = BufferedSink::failing_after(5);

        let err = h
            .proxy
            .serve(user("carol"), "/graphql", body(br#"{"query":"{ a }"}"#), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Relay(_)));
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.status, Some(StatusCode::OK));
        assert_eq!(sink.body, &BACKEND_BODY[..5]);
        assert_eq!(h.proxy.pools().outstanding(), 0);
    }

    fn first_chunk_then_idle() -> BodyStream {
        let first: io::Result<Bytes> = Ok(Bytes::from_static(b"{\"data\":"));
        stream::once(async move { first }).chain(stream::pending()).boxed()
    }

    fn reset_mid_body() -> BodyStream {
        let chunks: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"{\"data\":")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "backend reset")),
        ];
        stream::iter(chunks).boxed()
    }

    #[tokio::test]
    async fn relays_chunks_while_backend_is_still_sending() {
        let h = harness(MockTransport::replying(first_chunk_then_idle), ProxyOptions::default());
        let proxy = Arc::new(h.proxy);
        let (mut sink, pending) = crate::http::ChannelSink::new(4);

        let serving = Arc::clone(&proxy);
        let task = tokio::spawn(async move {
            let _ = serving
                .serve(user("kim"), "/graphql", body(br#"{"query":"{ a }"}"#), &mut sink)
                .await;
        });

        let response = tokio::time::timeout(Duration::from_millis(500), pending.into_response())
            .await
            .expect("status held back while backend idles");
        assert_eq!(response.status(), StatusCode::OK);

        let mut data = response.into_body().into_data_stream();
        let first = tokio::time::timeout(Duration::from_millis(500), data.next())
            .await
            .expect("first chunk held back while backend idles")
            .unwrap()
            .unwrap();
        assert_eq!(&first[..], b"{\"data\":");

        task.abort();
    }

    #[tokio::test]
    async fn backend_failure_mid_body_keeps_received_bytes() {
        let h = harness(MockTransport::replying(reset_mid_body), ProxyOptions::default());
        let mut sink = BufferedSink::new();

        let err = h
            .proxy
            .serve(user("lee"), "/graphql", body(br#"{"query":"{ a }"}"#), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Relay(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
        assert_eq!(sink.status, Some(StatusCode::OK));
        assert_eq!(sink.body, b"{\"data\":");
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.proxy.pools().outstanding(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_reported_once_and_never_dispatched() {
        let h = harness(MockTransport::default(), ProxyOptions::default());
        let mut sink = BufferedSink::new();

        let err = h
            .proxy
            .serve(user("dave"), "/graphql", body(br#"{"operationName":"Q","query":"{"#), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Decode(_)));
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.transport.calls(), 0);
        assert_eq!(sink.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(String::from_utf8_lossy(&sink.body).starts_with("decode error"));
    }

    #[tokio::test]
    async fn oversized_body_is_a_decode_error() {
        let options = ProxyOptions {
            max_body_bytes: 8,
            ..ProxyOptions::default()
        };
        let h = harness(MockTransport::default(), options);
        let mut sink = BufferedSink::new();

        let err = h
            .proxy
            .serve(user("erin"), "/graphql", body(br#"{"query":"{ a }"}"#), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Decode(_)));
        assert_eq!(h.transport.calls(), 0);
    }

    #[tokio::test]
    async fn dispatch_failure_is_reported_by_default() {
        let h = harness(MockTransport::failing(), ProxyOptions::default());
        let mut sink = BufferedSink::new();

        let err = h
            .proxy
            .serve(user("frank"), "/graphql", body(br#"{"query":"{ a }"}"#), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Dispatch(_)));
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.status, Some(StatusCode::BAD_GATEWAY));
        assert!(String::from_utf8_lossy(&sink.body).starts_with("dispatch error"));
    }

    #[tokio::test]
    async fn dispatch_failure_can_stay_silent() {
        let options = ProxyOptions {
            report_dispatch_errors: false,
            ..ProxyOptions::default()
        };
        let h = harness(MockTransport::failing(), options);
        let mut sink = BufferedSink::new();

        let err = h
            .proxy
            .serve(user("grace"), "/graphql", body(br#"{"query":"{ a }"}"#), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Dispatch(_)));
        assert_eq!(h.handler.calls.load(Ordering::SeqCst), 0);
        assert!(sink.status.is_none());
        assert!(sink.body.is_empty());
        assert_eq!(h.proxy.pools().outstanding(), 0);
    }

    #[tokio::test]
    async fn reused_invoker_never_keeps_previous_schema() {
        let h = harness(MockTransport::default(), ProxyOptions::default());

        let mut sink = BufferedSink::new();
        h.proxy
            .serve(user("heidi"), "/admin", body(br#"{"query":"{ b }"}"#), &mut sink)
            .await
            .unwrap();
        assert_eq!(h.transport.last_envelope()["query"], "{ B } #admin");

        let mut sink = BufferedSink::new();
        h.proxy
            .serve(user("heidi"), "/graphql", body(br#"{"query":"{ a }"}"#), &mut sink)
            .await
            .unwrap();
        assert_eq!(h.transport.last_envelope()["query"], "{ A } #main");

        let invokers = h.proxy.pools().invokers.stats();
        assert_eq!(invokers.created, 1, "the same invoker must serve both requests");
        assert_eq!(invokers.acquired, 2);
    }

    #[tokio::test]
    async fn dispatch_uses_default_backend_unless_route_scoped() {
        let h = harness(MockTransport::default(), ProxyOptions::default());
        let mut sink = BufferedSink::new();
        h.proxy
            .serve(user("ivan"), "/admin", body(br#"{"query":"{ b }"}"#), &mut sink)
            .await
            .unwrap();
        assert_eq!(h.transport.requests.lock()[0].0.port(), Some(4000));

        let options = ProxyOptions {
            route_scoped_dispatch: true,
            forward_operation_name: true,
            ..ProxyOptions::default()
        };
        let h = harness(MockTransport::default(), options);
        let mut sink = BufferedSink::new();
        h.proxy
            .serve(user("ivan"), "/admin", body(br#"{"operationName":"B","query":"query B { b }"}"#), &mut sink)
            .await
            .unwrap();
        assert_eq!(h.transport.requests.lock()[0].0.port(), Some(4001));
        assert_eq!(h.transport.last_envelope()["operationName"], "B");
    }

    #[tokio::test]
    async fn missing_route_config_is_a_config_error() {
        let transport = Arc::new(MockTransport::default());
        let pools = ProxyPools::with_chain(&PoolConfig::default(), Vec::new());
        let proxy = Proxy::builder(Arc::new(RouteTable::default()), pools)
            .transport(transport.clone())
            .build();
        let mut sink = BufferedSink::new();

        let err = proxy
            .serve(user("judy"), "/graphql", body(br#"{"query":"{ a }"}"#), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Config(_)));
        assert_eq!(transport.calls(), 0);
        assert_eq!(proxy.pools().outstanding(), 0);
    }
}
