//! Plan-and-execute entry points.

use crate::config::TransactConfig;
use crate::error::TransactionResult;
use crate::executor::Executor;
use crate::receipt::{Receipt, Unpacked};
use graft_core::{ContextId, GraphStore};
use graft_mutation::{encode, Bindings, Plan, Planner, Wish};
use tracing::{debug, instrument};

/// Plan a wish list against the current state of `graph` and execute it as
/// one transaction.
#[instrument(skip_all, fields(wishes = wishes.len()))]
pub fn transact<G: GraphStore>(
    graph: &mut G,
    wishes: &[Wish],
    config: &TransactConfig,
) -> TransactionResult<Receipt> {
    transact_with(graph, wishes, Bindings::new(), config)
}

/// Like [`transact`], with identifiers already bound to objects, e.g. the
/// bindings of an earlier receipt.
pub fn transact_with<G: GraphStore>(
    graph: &mut G,
    wishes: &[Wish],
    bindings: Bindings,
    config: &TransactConfig,
) -> TransactionResult<Receipt> {
    let plan = plan(graph, wishes, bindings, config)?;
    let receipt = execute(graph, &plan, config)?;
    Ok(filter(receipt, config))
}

/// Execute a nested template and return the receipt together with the
/// template's nesting filled in with objects.
#[instrument(skip_all)]
pub fn transact_template<G: GraphStore>(
    graph: &mut G,
    template: Wish,
    config: &TransactConfig,
) -> TransactionResult<(Receipt, Unpacked)> {
    let (shape, wishes) = encode(template);
    let plan = plan(graph, &wishes, Bindings::new(), config)?;
    let receipt = execute(graph, &plan, config)?;
    let unpacked = receipt.unpack(&shape);
    Ok((filter(receipt, config), unpacked))
}

fn plan<G: GraphStore>(
    graph: &G,
    wishes: &[Wish],
    bindings: Bindings,
    config: &TransactConfig,
) -> TransactionResult<Plan> {
    let plan = Planner::new(graph)
        .with_config(config.plan.clone())
        .with_bindings(bindings)
        .plan(wishes)?;
    debug!(commands = plan.commands.len(), "planned");
    Ok(plan)
}

fn execute<G: GraphStore>(
    graph: &mut G,
    plan: &Plan,
    config: &TransactConfig,
) -> TransactionResult<Receipt> {
    let context = config.context.unwrap_or_else(ContextId::current);
    Executor::new(graph).execute(plan, context)
}

fn filter(receipt: Receipt, config: &TransactConfig) -> Receipt {
    if config.keep_generated {
        receipt
    } else {
        receipt.without_generated()
    }
}
