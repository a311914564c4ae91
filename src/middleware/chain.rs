//! Dynamically composed middleware chain.

use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;

use crate::middleware::{ContextValues, Invoker, InvokerError, Schema, SchemaHandle};

/// A middleware step refused or failed to rewrite the query.
#[derive(Debug, Error)]
#[error("middleware '{middleware}' rejected query: {reason}")]
pub struct MiddlewareError {
    pub middleware: String,
    pub reason: String,
}

impl MiddlewareError {
    pub fn new(middleware: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            middleware: middleware.into(),
            reason: reason.into(),
        }
    }
}

/// One query transformation step.
pub trait QueryMiddleware: Send + Sync {
    /// Name used in errors and logs.
    fn name(&self) -> &str;

    /// Validate and/or rewrite `query` in place.
    fn on_request(
        &self,
        context: &ContextValues,
        schema: &Schema,
        query: &mut String,
    ) -> Result<(), MiddlewareError>;
}

/// An [`Invoker`] that runs its steps in order.
///
/// The step list is shared by every chain built from the same factory; only
/// the schema and the working query are per-instance.
pub struct MiddlewareChain {
    steps: Arc<[Arc<dyn QueryMiddleware>]>,
    schema: Option<SchemaHandle>,
    query: String,
    invoked: bool,
}

impl MiddlewareChain {
    pub fn new(steps: Arc<[Arc<dyn QueryMiddleware>]>) -> Self {
        Self {
            steps,
            schema: None,
            query: String::new(),
            invoked: false,
        }
    }

    /// Schema currently selected, if any.
    pub fn schema(&self) -> Option<&SchemaHandle> {
        self.schema.as_ref()
    }
}

impl Invoker for MiddlewareChain {
    fn set_schema(&mut self, schema: SchemaHandle) -> Result<(), InvokerError> {
        self.invoked = false;
        self.query.clear();
        if schema.is_blank() {
            self.schema = None;
            return Err(InvokerError::InvalidSchema {
                name: schema.name().to_string(),
                reason: "schema source is empty".to_string(),
            });
        }
        self.schema = Some(schema);
        Ok(())
    }

    fn invoke(&mut self, context: &ContextValues, query: &[u8]) -> Result<(), InvokerError> {
        self.invoked = false;
        let schema = self.schema.as_ref().ok_or(InvokerError::NoSchema)?;
        let query = std::str::from_utf8(query).map_err(|_| InvokerError::InvalidQuery)?;

        self.query.clear();
        self.query.push_str(query);
        for step in self.steps.iter() {
            step.on_request(context, schema, &mut self.query)?;
        }

        self.invoked = true;
        Ok(())
    }

    fn write_rewritten(&mut self, out: &mut BytesMut) -> Result<(), InvokerError> {
        if !self.invoked {
            return Err(InvokerError::NotInvoked);
        }
        out.extend_from_slice(self.query.as_bytes());
        Ok(())
    }

    fn reset(&mut self) {
        self.schema = None;
        self.query.clear();
        self.invoked = false;
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let steps: Vec<&str> = self.steps.iter().map(|s| s.name()).collect();
        f.debug_struct("MiddlewareChain")
            .field("steps", &steps)
            .field("schema", &self.schema.as_ref().map(|s| s.name()))
            .field("invoked", &self.invoked)
            .finish()
    }
}
