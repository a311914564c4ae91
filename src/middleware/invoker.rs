//! The invoker capability set used by the pipeline.

use bytes::BytesMut;
use thiserror::Error;

use crate::middleware::{ContextValues, MiddlewareError, SchemaHandle};
use crate::pool::{Pool, Reset};

/// Errors raised by an invoker.
#[derive(Debug, Error)]
pub enum InvokerError {
    /// The schema handed to `set_schema` cannot be used.
    #[error("invalid schema '{name}': {reason}")]
    InvalidSchema { name: String, reason: String },

    /// `invoke` was called before `set_schema`.
    #[error("no schema set on invoker")]
    NoSchema,

    /// `write_rewritten` was called before a successful `invoke`.
    #[error("no query has been invoked")]
    NotInvoked,

    /// The inbound query is not valid UTF-8.
    #[error("query is not valid UTF-8")]
    InvalidQuery,

    /// A middleware step rejected or failed to transform the query.
    #[error(transparent)]
    Middleware(#[from] MiddlewareError),
}

/// Executes a chain of query transformations.
///
/// Implementations are pooled and reused, so `set_schema` must be called
/// before every `invoke`, and `reset` must drop everything a previous
/// request left behind.
pub trait Invoker: Send {
    /// Select the schema for the next invocation.
    fn set_schema(&mut self, schema: SchemaHandle) -> Result<(), InvokerError>;

    /// Run the chain over `query`.
    fn invoke(&mut self, context: &ContextValues, query: &[u8]) -> Result<(), InvokerError>;

    /// Append the rewritten request representation to `out`.
    fn write_rewritten(&mut self, out: &mut BytesMut) -> Result<(), InvokerError>;

    /// Drop schema and query state.
    fn reset(&mut self);
}

impl Reset for Box<dyn Invoker> {
    fn reset(&mut self) {
        Invoker::reset(self.as_mut());
    }
}

/// Pool of type-erased invokers.
pub type InvokerPool = Pool<Box<dyn Invoker>>;

/// Build an invoker pool.
pub fn invoker_pool<F>(max_idle: usize, factory: F) -> InvokerPool
where
    F: Fn() -> Box<dyn Invoker> + Send + Sync + 'static,
{
    Pool::new("invoker", max_idle, factory)
}
