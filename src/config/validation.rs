//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing schemas)
//! - Validate value ranges (capacities > 0, backend URLs are `http` with a host)
//! - Detect duplicate route keys
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("schema '{0}' is defined more than once")]
    DuplicateSchema(String),

    #[error("schema '{0}' needs exactly one of `path` or `source`")]
    SchemaSource(String),

    #[error("schema '{0}' is empty")]
    EmptySchema(String),

    #[error("route '{route}' references unknown schema '{schema}'")]
    UnknownSchema { route: String, schema: String },

    #[error("route '{route}' has invalid backend url '{url}' (expected http://host/...)")]
    InvalidBackendUrl { route: String, url: String },

    #[error("route key '{0}' is used by more than one route")]
    DuplicateRouteKey(String),

    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("invalid context header '{0}'")]
    InvalidContextHeader(String),

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    let mut schema_names = HashSet::new();
    for schema in &config.schemas {
        if !schema_names.insert(schema.name.as_str()) {
            errors.push(ValidationError::DuplicateSchema(schema.name.clone()));
        }
        match (&schema.path, &schema.source) {
            (Some(_), None) => {}
            (None, Some(source)) if source.trim().is_empty() => {
                errors.push(ValidationError::EmptySchema(schema.name.clone()));
            }
            (None, Some(_)) => {}
            _ => errors.push(ValidationError::SchemaSource(schema.name.clone())),
        }
    }

    let check_target = |route: &str, schema: &str, url: &str, errors: &mut Vec<ValidationError>| {
        if !schema_names.contains(schema) {
            errors.push(ValidationError::UnknownSchema {
                route: route.to_string(),
                schema: schema.to_string(),
            });
        }
        // The transport connects over plain TCP only.
        let valid_url = Url::parse(url)
            .map(|u| u.scheme() == "http" && u.has_host())
            .unwrap_or(false);
        if !valid_url {
            errors.push(ValidationError::InvalidBackendUrl {
                route: route.to_string(),
                url: url.to_string(),
            });
        }
    };

    let mut route_keys = HashSet::new();
    for route in &config.routes {
        if !route_keys.insert(route.route_key.as_str()) {
            errors.push(ValidationError::DuplicateRouteKey(route.route_key.clone()));
        }
        check_target(&route.name, &route.schema, &route.backend_url, &mut errors);
    }
    if let Some(default) = &config.default_route {
        check_target("default", &default.schema, &default.backend_url, &mut errors);
    }

    for header in &config.pipeline.context_headers {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidContextHeader(header.clone()));
        }
    }

    let positive = [
        ("pipeline.max_body_bytes", config.pipeline.max_body_bytes),
        ("pipeline.response_channel_capacity", config.pipeline.response_channel_capacity),
        ("pools.buffer_capacity", config.pools.buffer_capacity),
        ("pools.reader_capacity", config.pools.reader_capacity),
        ("timeouts.request_secs", config.timeouts.request_secs as usize),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
