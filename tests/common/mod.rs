//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::any,
    Router,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;

use query_proxy::config::{DefaultRouteConfig, ProxyConfig, RouteConfig, SchemaConfig};
use query_proxy::http::HttpServer;
use query_proxy::lifecycle::{build_proxy, Shutdown};
use query_proxy::middleware::{ContextValues, MiddlewareError, QueryMiddleware, Schema};
use query_proxy::Proxy;

/// A request seen by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A mock backend that records every request and answers with a fixed reply.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}/graphql", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Body of the only request received so far.
    pub fn single_body(&self) -> String {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one backend request");
        String::from_utf8(requests[0].body.to_vec()).unwrap()
    }
}

#[derive(Clone)]
struct BackendState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    status: StatusCode,
    body: &'static str,
}

async fn record(State(state): State<BackendState>, headers: HeaderMap, body: Bytes) -> (StatusCode, &'static str) {
    state.requests.lock().push(RecordedRequest { headers, body });
    (state.status, state.body)
}

/// Start a mock backend on an ephemeral port.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockBackend {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = BackendState {
        requests: requests.clone(),
        status: StatusCode::from_u16(status).unwrap(),
        body,
    };
    let app = Router::new()
        .route("/{*path}", any(record))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, requests }
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A config with one schema whose default route points at `backend_url`.
pub fn config_for(backend_url: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;
    config.schemas.push(SchemaConfig {
        name: "main".into(),
        path: None,
        source: Some("type Query { me: User } type User { id: ID! name: String }".into()),
    });
    config.default_route = Some(DefaultRouteConfig {
        schema: "main".into(),
        backend_url: backend_url.into(),
    });
    config
}

/// Add a route for `route_key` to `config`.
pub fn with_route(mut config: ProxyConfig, route_key: &str, backend_url: &str) -> ProxyConfig {
    config.routes.push(RouteConfig {
        name: route_key.trim_start_matches('/').to_string(),
        route_key: route_key.into(),
        schema: "main".into(),
        backend_url: backend_url.into(),
    });
    config
}

/// A running proxy.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub proxy: Arc<Proxy>,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until every pooled item is back. Pipelines finish on their own
    /// task, slightly after the client has read the response.
    pub async fn wait_idle(&self) -> u64 {
        for _ in 0..100 {
            if self.proxy.pools().outstanding() == 0 {
                return 0;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.proxy.pools().outstanding()
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig, steps: Vec<Arc<dyn QueryMiddleware>>) -> TestProxy {
    let (proxy, _routes) = build_proxy(&config, steps).unwrap();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, proxy.clone());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, proxy, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Prefixes the query with a comment naming the caller.
pub struct TagUser;

impl QueryMiddleware for TagUser {
    fn name(&self) -> &str {
        "tag-user"
    }

    fn on_request(
        &self,
        context: &ContextValues,
        _schema: &Schema,
        query: &mut String,
    ) -> Result<(), MiddlewareError> {
        let user = String::from_utf8_lossy(context.get("user").unwrap_or_default()).into_owned();
        *query = format!("# user={}\n{}", user, query);
        Ok(())
    }
}

/// Rejects mutations.
pub struct ReadOnly;

impl QueryMiddleware for ReadOnly {
    fn name(&self) -> &str {
        "read-only"
    }

    fn on_request(
        &self,
        _context: &ContextValues,
        _schema: &Schema,
        query: &mut String,
    ) -> Result<(), MiddlewareError> {
        if query.trim_start().starts_with("mutation") {
            return Err(MiddlewareError::new(self.name(), "mutations are not allowed"));
        }
        Ok(())
    }
}
