//! Per-request context values handed to the middleware chain.

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName};
use bytes::Bytes;

/// Read-only mapping from context keys to raw bytes (e.g. `user`).
///
/// Built once per request from inbound headers and dropped with the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextValues {
    values: HashMap<String, Bytes>,
}

impl ContextValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the given headers. A missing header maps to empty bytes so the
    /// key is always present for the middleware chain.
    pub fn from_headers(headers: &HeaderMap, names: &[HeaderName]) -> Self {
        let mut values = HashMap::with_capacity(names.len());
        for name in names {
            let value = headers
                .get(name)
                .map(|v| Bytes::copy_from_slice(v.as_bytes()))
                .unwrap_or_default();
            values.insert(name.as_str().to_string(), value);
        }
        Self { values }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.values.get(key).map(|v| v.as_ref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
