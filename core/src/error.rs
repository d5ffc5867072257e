//! Common error types for Graft.

use crate::{ContextId, GraphUid, Uid};
use thiserror::Error;

/// Errors that can occur during graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// No object with this uid was ever on the graph.
    #[error("Object not found: {0}")]
    ObjectNotFound(Uid),

    /// The object exists but has been terminated.
    #[error("Object terminated: {0}")]
    Terminated(Uid),

    /// A value cannot be stored under the attribute's value type.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Only attribute entities hold values.
    #[error("Object {0} cannot hold a value")]
    NotAssignable(Uid),

    /// A merge found an object with the same origin but a different shape.
    #[error("Origin conflict on {uid}: stored {stored}, merging {merging}")]
    OriginConflict {
        uid: Uid,
        stored: String,
        merging: String,
    },

    /// Writes are only allowed inside an open transaction.
    #[error("No transaction is open on graph {0}")]
    NoActiveTransaction(GraphUid),

    /// Another context already holds the graph's transaction.
    #[error("Graph {graph} is held by {holder}; {requester} cannot open a transaction")]
    ConcurrentTransaction {
        graph: GraphUid,
        holder: ContextId,
        requester: ContextId,
    },

    /// A transaction handle was closed out of order or on the wrong graph.
    #[error("Stale transaction handle: {0}")]
    StaleHandle(String),

    /// Invalid operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl GraphError {
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn origin_conflict(uid: Uid, stored: impl Into<String>, merging: impl Into<String>) -> Self {
        Self::OriginConflict {
            uid,
            stored: stored.into(),
            merging: merging.into(),
        }
    }

    pub fn stale_handle(message: impl Into<String>) -> Self {
        Self::StaleHandle(message.into())
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
