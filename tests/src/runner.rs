//! Scenario runner.
//!
//! A scenario is a sequence of named steps run against one graph. Each step
//! is a wish list executed as one transaction; the user names of earlier
//! receipts stay bound, so later steps can refer to objects by the names
//! they were created under.

use graft_core::GraphUid;
use graft_graph::Graph;
use graft_mutation::{Bindings, Wish};
use graft_transaction::{transact_with, Receipt, TransactConfig, TransactionError, TxMarker};

use crate::assertion::{Assertion, StepOutcome};
use crate::error::{ScenarioError, ScenarioResult};
use crate::loader::replay_wishes;

enum Input {
    Wishes(Vec<Wish>),
    Replay(String),
}

struct Step {
    name: String,
    input: Input,
    assertion: Assertion,
}

/// A named sequence of transactions with expectations.
pub struct Scenario {
    name: String,
    graph: GraphUid,
    config: TransactConfig,
    steps: Vec<Step>,
}

/// The state left behind by a successful scenario.
#[derive(Debug)]
pub struct ScenarioRun {
    pub graph: Graph,
    pub bindings: Bindings,
    receipts: Vec<(String, Receipt)>,
}

impl ScenarioRun {
    /// Receipt of a step that succeeded.
    pub fn receipt(&self, step: &str) -> ScenarioResult<&Receipt> {
        self.receipts
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, receipt)| receipt)
            .ok_or_else(|| ScenarioError::UnknownStep(step.to_string()))
    }
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: crate::TEST_GRAPH,
            config: TransactConfig::new(),
            steps: Vec::new(),
        }
    }

    pub fn config(mut self, config: TransactConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a step executing `wishes`.
    pub fn step(
        mut self,
        name: impl Into<String>,
        wishes: Vec<Wish>,
        expect: impl FnOnce(Assertion) -> Assertion,
    ) -> Self {
        self.steps.push(Step {
            name: name.into(),
            input: Input::Wishes(wishes),
            assertion: expect(Assertion::new()),
        });
        self
    }

    /// Add a step replaying a JSON command list.
    pub fn replay(
        mut self,
        name: impl Into<String>,
        json: impl Into<String>,
        expect: impl FnOnce(Assertion) -> Assertion,
    ) -> Self {
        self.steps.push(Step {
            name: name.into(),
            input: Input::Replay(json.into()),
            assertion: expect(Assertion::new()),
        });
        self
    }

    /// Run every step in order, stopping at the first failed assertion.
    pub fn run(self) -> ScenarioResult<ScenarioRun> {
        crate::init_tracing();
        let mut run = ScenarioRun {
            graph: Graph::with_uid(self.graph),
            bindings: Bindings::new(),
            receipts: Vec::new(),
        };

        for step in self.steps {
            let wishes = match step.input {
                Input::Wishes(wishes) => wishes,
                Input::Replay(json) => replay_wishes(&step.name, &json)?,
            };

            let result = execute(&mut run.graph, &wishes, &run.bindings, &self.config);
            if let Ok(outcome) = &result {
                for (id, object) in outcome.receipt.iter() {
                    run.bindings.bind(id.clone(), object.uid);
                }
            }
            step.assertion
                .verify(&step.name, &result, &run.graph, &run.bindings)
                .map_err(|e| in_scenario(&self.name, e))?;

            if let Ok(outcome) = result {
                run.receipts.push((step.name, outcome.receipt));
            }
        }

        Ok(run)
    }
}

fn execute(
    graph: &mut Graph,
    wishes: &[Wish],
    bindings: &Bindings,
    config: &TransactConfig,
) -> Result<StepOutcome, TransactionError> {
    let stored_before = graph.object_count();
    let live_before = graph.live_count();

    let receipt = transact_with(graph, wishes, bindings.clone(), config)?;

    let markers = usize::from(matches!(receipt.tx(), TxMarker::Committed(_)));
    let created = graph.object_count() - stored_before - markers;
    let terminated = (live_before + created).saturating_sub(graph.live_count());
    Ok(StepOutcome {
        receipt,
        created,
        terminated,
    })
}

fn in_scenario(scenario: &str, error: ScenarioError) -> ScenarioError {
    match error {
        ScenarioError::AssertionFailed { step, message } => {
            ScenarioError::assertion_failed(format!("{}/{}", scenario, step), message)
        }
        other => other,
    }
}
