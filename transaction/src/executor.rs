//! Plan execution.
//!
//! Applies the commands of a [`Plan`] in order inside one transaction
//! scope. Any failure aborts the scope, so either every command takes
//! effect or none does.

use crate::error::{ExecutionError, ExecutionResult, TransactionError, TransactionResult};
use crate::receipt::{Receipt, TxMarker};
use crate::scope::TransactionScope;
use graft_core::{ContextId, GraphStore, GraphView, RepType, TxOutcome, Uid};
use graft_mutation::{Atom, Command, Ident, Origin, Plan};
use std::collections::BTreeMap;
use tracing::{debug, instrument, trace, warn};

/// Executes plans against a graph.
pub struct Executor<'g, G: GraphStore> {
    graph: &'g mut G,
}

impl<'g, G: GraphStore> Executor<'g, G> {
    pub fn new(graph: &'g mut G) -> Self {
        Self { graph }
    }

    /// Execute a plan atomically on behalf of `context`.
    #[instrument(skip_all, fields(graph = %plan.graph, commands = plan.commands.len(), %context))]
    pub fn execute(&mut self, plan: &Plan, context: ContextId) -> TransactionResult<Receipt> {
        let actual = self.graph.graph_uid();
        if plan.graph != actual {
            return Err(TransactionError::GraphMismatch {
                planned: plan.graph,
                actual,
            });
        }

        let mut scope =
            TransactionScope::open(&mut *self.graph, context).map_err(TransactionError::Scope)?;
        let current = scope.graph().latest_slice();
        if current != plan.slice {
            return Err(TransactionError::StaleSnapshot {
                planned: plan.slice,
                current,
            });
        }

        let mut created: BTreeMap<Ident, Uid> = BTreeMap::new();
        for command in &plan.commands {
            trace!(command = %command, "applying");
            if let Err(e) = apply(scope.graph_mut(), plan, command, &mut created) {
                warn!(command = %command, error = %e, "command failed, aborting");
                if let Err(abort) = scope.abort() {
                    warn!(error = %abort, "abort failed");
                }
                return Err(TransactionError::execution(actual, e));
            }
        }

        let tx = match scope.commit().map_err(TransactionError::Scope)? {
            TxOutcome::Committed { marker } => TxMarker::Committed(marker),
            TxOutcome::Unchanged { .. } => TxMarker::NoTransaction,
            TxOutcome::Nested => TxMarker::Nested,
            TxOutcome::Aborted => return Err(TransactionError::RolledBack),
        };
        debug!(created = created.len(), ?tx, "plan executed");

        Ok(self.receipt(plan, &created, tx))
    }

    /// Resolve every identifier of the plan against the graph as it is now.
    fn receipt(&self, plan: &Plan, created: &BTreeMap<Ident, Uid>, tx: TxMarker) -> Receipt {
        let graph: &G = &*self.graph;
        let objects = plan
            .idents
            .iter()
            .filter(|id| !matches!(id, Ident::Origin(_)))
            .filter_map(|id| {
                let uid = resolve(graph, plan, id, created)?;
                graph.object(uid).map(|object| (id.clone(), object))
            })
            .collect();
        Receipt::new(objects, tx)
    }
}

fn resolve<G: GraphView>(
    graph: &G,
    plan: &Plan,
    id: &Ident,
    created: &BTreeMap<Ident, Uid>,
) -> Option<Uid> {
    let canonical = plan.canonical(id);
    if let Some(uid) = created.get(&canonical) {
        return Some(*uid);
    }
    match &canonical {
        Ident::Origin(uid) => Some(*uid),
        Ident::Delegate(delegate) => graph.find_delegate(delegate),
        Ident::Value(value) => graph.find_value_node(value),
        Ident::User(_) | Ident::Generated(_) => None,
    }
}

fn uid_of<G: GraphView>(
    graph: &G,
    plan: &Plan,
    id: &Ident,
    created: &BTreeMap<Ident, Uid>,
) -> ExecutionResult<Uid> {
    resolve(graph, plan, id, created).ok_or_else(|| ExecutionError::Unresolved(id.clone()))
}

fn apply<G: GraphStore>(
    graph: &mut G,
    plan: &Plan,
    command: &Command,
    created: &mut BTreeMap<Ident, Uid>,
) -> ExecutionResult<()> {
    match command {
        Command::Instantiate(c) => {
            let uid = match &c.atom {
                Atom::Entity(ty) => graph.instantiate(&RepType::Entity(ty.clone()))?,
                Atom::Attribute(ty) => graph.instantiate(&RepType::Attribute(ty.clone()))?,
                Atom::Relation { rt, source, target } => {
                    let source = uid_of(graph, plan, source, created)?;
                    let target = uid_of(graph, plan, target, created)?;
                    graph.instantiate_relation(rt, source, target)?
                }
                Atom::Delegate(delegate) => graph.delegate(delegate)?,
                Atom::ValueNode(value) => graph.value_node(value)?,
            };
            created.extend(command.produces().into_iter().map(|id| (id, uid)));
        }
        Command::Merge(c) => {
            let uid = match &c.origin {
                Origin::Object(object) => graph.merge_by_origin(&object.kind, object.uid)?,
                Origin::Delegate(delegate) => graph.delegate(delegate)?,
                Origin::Value(value) => graph.value_node(value)?,
            };
            created.extend(command.produces().into_iter().map(|id| (id, uid)));
        }
        Command::Assign(c) => {
            let uid = uid_of(graph, plan, &c.target, created)?;
            graph.assign_value(uid, c.value.clone())?;
        }
        Command::Terminate(c) => {
            let uid = uid_of(graph, plan, &c.target, created)?;
            graph.terminate(uid)?;
        }
        Command::Tag(c) => {
            let uid = uid_of(graph, plan, &c.target, created)?;
            graph.attach_tag(uid, &c.tag)?;
        }
        Command::SetField(_)
        | Command::Alias(_)
        | Command::BeSource(_)
        | Command::BeTarget(_)
        | Command::MustLive(_) => return Err(ExecutionError::NotExecutable(command.kind())),
    }
    Ok(())
}
