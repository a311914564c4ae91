//! Schema handles shared between routes and invokers.

use std::sync::Arc;

/// A named schema source. Compilation belongs to the middleware steps that
/// need it; the proxy only moves the handle around.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    name: String,
    source: String,
}

/// Cheap, shareable reference to a schema.
pub type SchemaHandle = Arc<Schema>;

impl Schema {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Wrap into a shareable handle.
    pub fn into_handle(self) -> SchemaHandle {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the source has no definitions at all.
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }
}
