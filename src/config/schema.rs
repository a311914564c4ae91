//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the query proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Named schema sources referenced by routes.
    pub schemas: Vec<SchemaConfig>,

    /// Route definitions mapping route keys to schema and backend.
    pub routes: Vec<RouteConfig>,

    /// Route used for unmatched keys and for dispatch.
    pub default_route: Option<DefaultRouteConfig>,

    /// Pipeline behavior.
    pub pipeline: PipelineConfig,

    /// Resource pool sizing.
    pub pools: PoolConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A named schema. Exactly one of `path` and `source` is expected; the
/// loader reads `path` (relative to the config file) into `source`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaConfig {
    /// Name routes use to reference this schema.
    pub name: String,

    /// Schema file.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Inline schema source.
    #[serde(default)]
    pub source: Option<String>,
}

/// Route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Request target to match (e.g., "/graphql"). Query strings are
    /// ignored when no exact match exists.
    pub route_key: String,

    /// Schema name.
    pub schema: String,

    /// Backend endpoint (e.g., "http://127.0.0.1:4000/graphql").
    pub backend_url: String,
}

/// The default route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DefaultRouteConfig {
    /// Schema name.
    pub schema: String,

    /// Backend endpoint.
    pub backend_url: String,
}

/// Pipeline behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest inbound body accepted, in bytes.
    pub max_body_bytes: usize,

    /// Request headers exposed to the middleware chain as context values.
    pub context_headers: Vec<String>,

    /// Copy the inbound operation name into the outbound envelope.
    pub forward_operation_name: bool,

    /// Dispatch to the matched route's backend instead of the default route.
    pub route_scoped_dispatch: bool,

    /// Report backend failures through the error hook.
    pub report_dispatch_errors: bool,

    /// Body chunks buffered between the pipeline task and the HTTP response.
    pub response_channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            context_headers: vec!["user".to_string()],
            forward_operation_name: false,
            route_scoped_dispatch: false,
            report_dispatch_errors: true,
            response_channel_capacity: 16,
        }
    }
}

/// Resource pool sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle items kept per pool.
    pub max_idle: usize,

    /// Initial capacity of request buffers, in bytes.
    pub buffer_capacity: usize,

    /// Chunk coalescing size of stream readers, in bytes.
    pub reader_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: 256,
            buffer_capacity: 4 * 1024,
            reader_capacity: 8 * 1024,
        }
    }
}

/// Timeout configuration for backend calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time to wait for the backend's response head, in seconds. Also the
    /// inbound request timeout.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
