//! Executor: evaluates a [`CompiledOperation`]'s top-level projections
//! against a live host context. Query fields and mutation fields are both
//! walked in document order — mutations are never expected to run
//! concurrently, and a plain sequential walk gives that for free without a
//! separate mutation code path.

use serde_json::Map;

use crate::compile::CompiledOperation;
use crate::error::{GraphQLError, PathSegment, Response};
use crate::expr;
use crate::host::value::HostValue;

#[derive(Clone, Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("{0}")]
    Internal(String),
}

/// A cooperative cancellation signal, checked between top-level fields.
/// `()` never cancels, for callers with no cancellation model of their own.
pub trait CancellationToken: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl CancellationToken for () {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Raised when execution is aborted by a [`CancellationToken`] partway
/// through a multi-field operation; there is no partial-result recovery
/// once this fires.
#[derive(Clone, Copy, Debug, thiserror::Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

pub struct Executor;

impl Executor {
    /// Evaluates every top-level field's projection against `root`. A
    /// field whose evaluation fails is logged, set to `null` in `data`,
    /// and contributes a `{path, message}` entry to `errors`; the
    /// remaining fields still run. Returns `Err(Cancelled)`
    /// only if `cancellation` reports cancelled before the response could
    /// be assembled at all.
    pub fn execute(
        operation: &CompiledOperation,
        root: &HostValue,
        cancellation: &dyn CancellationToken,
    ) -> Result<Response, Cancelled> {
        let mut data = Map::new();
        let mut errors = Vec::new();

        for (output_name, projection) in &operation.fields {
            if cancellation.is_cancelled() {
                return Err(Cancelled);
            }
            match expr::eval(projection, root) {
                Ok(value) => {
                    data.insert(output_name.clone(), serde_json::Value::from(&value));
                }
                Err(err) => {
                    tracing::warn!(field = %output_name, error = %err, "field execution failed");
                    data.insert(output_name.clone(), serde_json::Value::Null);
                    errors.push(
                        GraphQLError::new(err.to_string()).with_path(vec![PathSegment::Field(output_name.clone())]),
                    );
                }
            }
        }

        Ok(if errors.is_empty() {
            Response::data_only(serde_json::Value::Object(data))
        } else {
            Response::with_field_errors(serde_json::Value::Object(data), errors)
        })
    }
}
