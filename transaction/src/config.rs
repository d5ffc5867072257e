//! Configuration for the transact entry points.

use graft_core::ContextId;
use graft_mutation::PlanConfig;

/// Configuration for [`transact`](crate::transact) and friends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactConfig {
    pub plan: PlanConfig,
    /// Keep planner-minted identifiers in the receipt.
    pub keep_generated: bool,
    /// Context opening the transaction. Defaults to the calling thread's.
    pub context: Option<ContextId>,
}

impl TransactConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for inspecting plans: receipts keep every identifier.
    pub fn debug() -> Self {
        Self {
            keep_generated: true,
            ..Self::default()
        }
    }

    pub fn with_plan(mut self, plan: PlanConfig) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_keep_generated(mut self, keep: bool) -> Self {
        self.keep_generated = keep;
        self
    }

    pub fn with_context(mut self, context: ContextId) -> Self {
        self.context = Some(context);
        self
    }
}
