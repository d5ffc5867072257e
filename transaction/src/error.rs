//! Transaction error types.

use graft_core::{GraphError, GraphUid, SliceId};
use graft_mutation::{CommandKind, Ident, PlanError};
use thiserror::Error;

/// Transaction errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The wish list could not be planned.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A command failed; everything the transaction did was rolled back.
    #[error("error executing graph transaction on graph {graph}")]
    Execution {
        graph: GraphUid,
        #[source]
        source: ExecutionError,
    },

    /// The transaction scope could not be opened or closed.
    #[error("transaction scope error: {0}")]
    Scope(GraphError),

    /// The graph moved on since the plan was computed.
    #[error("stale snapshot: planned at {planned}, graph is at {current}")]
    StaleSnapshot { planned: SliceId, current: SliceId },

    /// The plan was computed against another graph.
    #[error("plan for graph {planned} executed on graph {actual}")]
    GraphMismatch { planned: GraphUid, actual: GraphUid },

    /// An inner scope aborted, so the commit was turned into a rollback.
    #[error("transaction rolled back")]
    RolledBack,
}

impl TransactionError {
    pub fn execution(graph: GraphUid, source: impl Into<ExecutionError>) -> Self {
        Self::Execution {
            graph,
            source: source.into(),
        }
    }
}

/// Failure of a single command.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// No object is known for an identifier a command needs.
    #[error("identifier {0} does not resolve to an object")]
    Unresolved(Ident),

    /// Constraint and expansion commands never reach the graph.
    #[error("{0} commands cannot be executed")]
    NotExecutable(CommandKind),
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Result type for single command execution.
pub type ExecutionResult<T> = Result<T, ExecutionError>;
