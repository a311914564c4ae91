//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled per-route configs
//! - Resolve a route key (or no key) to a `RequestConfig`
//! - Allow the whole table to be replaced at runtime

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use url::Url;

use crate::config::ProxyConfig;
use crate::middleware::{Schema, SchemaHandle};
use crate::routing::matcher;

/// Per-route configuration resolved for one request.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub schema: SchemaHandle,
    pub backend_url: Url,
}

/// Resolves route keys to request configs.
///
/// `None` as route key denotes the default route. Implementations must be
/// safe to call from many tasks at once.
pub trait RequestConfigProvider: Send + Sync {
    fn request_config(&self, route_key: Option<&str>) -> Option<RequestConfig>;
}

/// Errors while compiling a route table.
#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("route '{route}' references unknown schema '{schema}'")]
    UnknownSchema { route: String, schema: String },

    #[error("route '{route}' has invalid backend url '{url}': {source}")]
    InvalidBackendUrl {
        route: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("schema '{0}' has no loaded source")]
    MissingSource(String),
}

/// Immutable table of compiled routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, RequestConfig>,
    default: Option<RequestConfig>,
}

impl RouteTable {
    pub fn new(routes: HashMap<String, RequestConfig>, default: Option<RequestConfig>) -> Self {
        Self { routes, default }
    }

    /// Compile routes from configuration. Schema sources must already be
    /// loaded (see `config::loader`).
    pub fn from_config(config: &ProxyConfig) -> Result<Self, RouteTableError> {
        let mut schemas: HashMap<&str, SchemaHandle> = HashMap::new();
        for schema in &config.schemas {
            let source = schema
                .source
                .as_deref()
                .ok_or_else(|| RouteTableError::MissingSource(schema.name.clone()))?;
            schemas.insert(&schema.name, Schema::new(&schema.name, source).into_handle());
        }

        let compile = |route: &str, schema: &str, url: &str| -> Result<RequestConfig, RouteTableError> {
            let schema = schemas
                .get(schema)
                .cloned()
                .ok_or_else(|| RouteTableError::UnknownSchema {
                    route: route.to_string(),
                    schema: schema.to_string(),
                })?;
            let backend_url = Url::parse(url).map_err(|source| RouteTableError::InvalidBackendUrl {
                route: route.to_string(),
                url: url.to_string(),
                source,
            })?;
            Ok(RequestConfig { schema, backend_url })
        };

        let mut routes = HashMap::with_capacity(config.routes.len());
        for route in &config.routes {
            let compiled = compile(&route.name, &route.schema, &route.backend_url)?;
            routes.insert(route.route_key.clone(), compiled);
        }

        let default = match &config.default_route {
            Some(d) => Some(compile("default", &d.schema, &d.backend_url)?),
            None => None,
        };

        tracing::debug!(
            routes = routes.len(),
            has_default = default.is_some(),
            "Route table compiled"
        );

        Ok(Self { routes, default })
    }

    /// Look up a route key, falling back to the default route.
    pub fn lookup(&self, route_key: Option<&str>) -> Option<&RequestConfig> {
        if let Some(key) = route_key {
            for candidate in matcher::candidates(key) {
                if let Some(config) = self.routes.get(candidate) {
                    return Some(config);
                }
            }
        }
        self.default.as_ref()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl RequestConfigProvider for RouteTable {
    fn request_config(&self, route_key: Option<&str>) -> Option<RequestConfig> {
        self.lookup(route_key).cloned()
    }
}

/// A route table that can be swapped while requests are in flight.
#[derive(Debug)]
pub struct SharedRouteTable {
    inner: ArcSwap<RouteTable>,
}

impl SharedRouteTable {
    pub fn new(table: RouteTable) -> Self {
        Self {
            inner: ArcSwap::from_pointee(table),
        }
    }

    /// Replace the table. In-flight lookups keep the table they loaded.
    pub fn store(&self, table: RouteTable) {
        self.inner.store(Arc::new(table));
    }

    pub fn load(&self) -> Arc<RouteTable> {
        self.inner.load_full()
    }
}

impl RequestConfigProvider for SharedRouteTable {
    fn request_config(&self, route_key: Option<&str>) -> Option<RequestConfig> {
        self.inner.load().lookup(route_key).cloned()
    }
}
