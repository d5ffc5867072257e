//! Tracking of which context holds a graph's transaction.

use graft_core::{ContextId, Finish, GraphError, GraphResult, GraphUid, TxHandle};

/// Transaction holder state of one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HolderState {
    /// No transaction is open.
    #[default]
    Inactive,
    /// A context holds the transaction, possibly through nested scopes.
    Active {
        context: ContextId,
        depth: usize,
        /// An inner scope aborted; the outermost close must abort too.
        poisoned: bool,
    },
}

/// What leaving a scope means for the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Leave {
    Nested,
    Outermost { commit: bool },
}

impl HolderState {
    /// The context holding the transaction, if any.
    pub fn holder(&self) -> Option<ContextId> {
        match self {
            HolderState::Inactive => None,
            HolderState::Active { context, .. } => Some(*context),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, HolderState::Active { .. })
    }

    /// Enter a scope for `requester`, returning its nesting depth.
    pub(crate) fn enter(&mut self, graph: GraphUid, requester: ContextId) -> GraphResult<usize> {
        match self {
            HolderState::Inactive => {
                *self = HolderState::Active {
                    context: requester,
                    depth: 1,
                    poisoned: false,
                };
                Ok(1)
            }
            HolderState::Active { context, depth, .. } if *context == requester => {
                *depth += 1;
                Ok(*depth)
            }
            HolderState::Active { context, .. } => Err(GraphError::ConcurrentTransaction {
                graph,
                holder: *context,
                requester,
            }),
        }
    }

    /// Leave the innermost scope. Scopes must be left in reverse order of
    /// entry, by the context that entered them.
    pub(crate) fn leave(
        &mut self,
        graph: GraphUid,
        handle: &TxHandle,
        finish: Finish,
    ) -> GraphResult<Leave> {
        if handle.graph() != graph {
            return Err(GraphError::stale_handle(format!(
                "handle for {} closed on {}",
                handle.graph(),
                graph
            )));
        }
        match self {
            HolderState::Inactive => Err(GraphError::NoActiveTransaction(graph)),
            HolderState::Active {
                context,
                depth,
                poisoned,
            } => {
                if *context != handle.context() || *depth != handle.depth() {
                    return Err(GraphError::stale_handle(format!(
                        "scope {}/{} closed while {}/{} is innermost",
                        handle.context(),
                        handle.depth(),
                        context,
                        depth
                    )));
                }
                if finish == Finish::Abort {
                    *poisoned = true;
                }
                if *depth > 1 {
                    *depth -= 1;
                    return Ok(Leave::Nested);
                }
                let commit = !*poisoned;
                *self = HolderState::Inactive;
                Ok(Leave::Outermost { commit })
            }
        }
    }
}
