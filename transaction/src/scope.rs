//! RAII transaction scopes.

use graft_core::{ContextId, Finish, GraphError, GraphResult, GraphStore, TxHandle, TxOutcome};
use tracing::{debug, warn};

/// An open transaction scope on a graph.
///
/// The scope holds the graph's transaction for its context until it is
/// committed or aborted. Dropping an open scope aborts it, so an early
/// return or a panic never leaves a transaction open.
///
/// Scopes nest: opening a scope on a graph the same context already holds
/// yields an inner scope, and only the outermost scope decides whether
/// the changes are kept.
pub struct TransactionScope<'g, G: GraphStore> {
    graph: &'g mut G,
    handle: Option<TxHandle>,
}

impl<'g, G: GraphStore> TransactionScope<'g, G> {
    /// Open a scope for `context`. Fails if another context holds the graph.
    pub fn open(graph: &'g mut G, context: ContextId) -> GraphResult<Self> {
        let handle = graph.open_transaction(context)?;
        Ok(Self {
            graph,
            handle: Some(handle),
        })
    }

    pub fn graph(&self) -> &G {
        &*self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut *self.graph
    }

    /// Nesting depth of this scope; 1 is the outermost.
    pub fn depth(&self) -> usize {
        self.handle.as_ref().map_or(0, TxHandle::depth)
    }

    pub fn is_outermost(&self) -> bool {
        self.handle.as_ref().is_some_and(TxHandle::is_outermost)
    }

    pub fn commit(mut self) -> GraphResult<TxOutcome> {
        self.close(Finish::Commit)
    }

    pub fn abort(mut self) -> GraphResult<TxOutcome> {
        self.close(Finish::Abort)
    }

    fn close(&mut self, finish: Finish) -> GraphResult<TxOutcome> {
        match self.handle.take() {
            Some(handle) => self.graph.close_transaction(handle, finish),
            None => Err(GraphError::stale_handle("scope already closed")),
        }
    }
}

impl<G: GraphStore> Drop for TransactionScope<'_, G> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let depth = handle.depth();
            match self.graph.close_transaction(handle, Finish::Abort) {
                Ok(_) => debug!(depth, "transaction scope dropped and aborted"),
                Err(e) => warn!(depth, error = %e, "failed to abort dropped transaction scope"),
            }
        }
    }
}
