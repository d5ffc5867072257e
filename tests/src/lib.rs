//! Graft Tests
//!
//! Scenario framework for the integration tests.
//!
//! Responsibilities:
//! - Run named steps of wish lists against one graph
//! - Verify each step's receipt and change counts
//! - Replay serialized command lists
//!
//! # Module Structure
//!
//! - `runner` - Scenario builder and runner
//! - `assertion` - Step assertions
//! - `loader` - JSON command list loading
//! - `error` - Error types for scenario failures

mod assertion;
mod error;
mod loader;
mod runner;

pub use assertion::{full_message, Assertion, StepOutcome};
pub use error::{ScenarioError, ScenarioResult};
pub use loader::{parse_commands, replay_wishes};
pub use runner::{Scenario, ScenarioRun};

use graft_core::GraphUid;
use graft_graph::Graph;

/// Uid of the graphs scenarios run against.
pub const TEST_GRAPH: GraphUid = GraphUid(0x6AF7);

/// A fresh graph with a fixed uid.
pub fn graph() -> Graph {
    Graph::with_uid(TEST_GRAPH)
}

/// Install a test-friendly tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub mod prelude {
    pub use crate::{graph, init_tracing, Assertion, Scenario, ScenarioRun, TEST_GRAPH};
    pub use graft_core::{
        ContextId, DelegateRef, EntityType, GraphStore, GraphUid, GraphView, ObjectKind, ObjectRef,
        RelationType, RepType, SliceId, Uid, Value, ValueType,
    };
    pub use graft_graph::Graph;
    pub use graft_mutation::{Bindings, Command, Ident, PlanConfig, PlanError, Planner, Wish};
    pub use graft_transaction::{
        transact, transact_template, transact_with, Receipt, TransactConfig, TransactionError,
        TxMarker, Unpacked,
    };
}
