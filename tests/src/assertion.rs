//! Assertion types and builders for verifying step outcomes.

use graft_core::{GraphView, Uid, Value};
use graft_graph::Graph;
use graft_mutation::{Bindings, Ident};
use graft_transaction::{Receipt, TransactionError, TxMarker};

use crate::error::{ScenarioError, ScenarioResult};

/// What one step did to the graph.
#[derive(Debug)]
pub struct StepOutcome {
    pub receipt: Receipt,
    /// Objects created, transaction markers excluded.
    pub created: usize,
    /// Objects terminated, cascaded relations included.
    pub terminated: usize,
}

/// A complete assertion for a step outcome.
#[derive(Default)]
pub struct Assertion {
    // Change counts
    pub created: Option<usize>,
    pub terminated: Option<usize>,
    pub unchanged: bool,

    // Receipt contents
    pub names: Vec<String>,
    pub absent: Vec<String>,
    pub values: Vec<(String, Value)>,
    pub tags: Vec<(String, String)>,

    // Error assertions
    pub error: Option<String>,
    pub error_pattern: Option<String>,

    // Custom assertion function
    #[allow(clippy::type_complexity)]
    pub custom: Option<Box<dyn Fn(&StepOutcome, &Graph) -> bool + Send + Sync>>,
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assertion")
            .field("created", &self.created)
            .field("terminated", &self.terminated)
            .field("unchanged", &self.unchanged)
            .field("names", &self.names)
            .field("absent", &self.absent)
            .field("values", &self.values)
            .field("error", &self.error)
            .field("custom", &self.custom.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Assertion {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Builders ==========

    pub fn created(mut self, n: usize) -> Self {
        self.created = Some(n);
        self
    }

    pub fn terminated(mut self, n: usize) -> Self {
        self.terminated = Some(n);
        self
    }

    /// The step must not record a transaction.
    pub fn unchanged(mut self) -> Self {
        self.unchanged = true;
        self
    }

    /// The receipt must name a live object.
    pub fn has(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// The receipt must not name this identifier.
    pub fn lacks(mut self, name: impl Into<String>) -> Self {
        self.absent.push(name.into());
        self
    }

    /// The attribute bound to `name` must hold this value.
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    /// The tag must name the object bound to `name`.
    pub fn tagged(mut self, tag: impl Into<String>, name: impl Into<String>) -> Self {
        self.tags.push((tag.into(), name.into()));
        self
    }

    pub fn error(mut self, contains: impl Into<String>) -> Self {
        self.error = Some(contains.into());
        self
    }

    pub fn error_matches(mut self, pattern: impl Into<String>) -> Self {
        self.error_pattern = Some(pattern.into());
        self
    }

    pub fn custom(mut self, check: impl Fn(&StepOutcome, &Graph) -> bool + Send + Sync + 'static) -> Self {
        self.custom = Some(Box::new(check));
        self
    }

    // ========== Verification ==========

    /// Verify the assertion against a step result.
    ///
    /// `bindings` holds every name bound so far, this step's included.
    pub fn verify(
        &self,
        step: &str,
        result: &Result<StepOutcome, TransactionError>,
        graph: &Graph,
        bindings: &Bindings,
    ) -> ScenarioResult<()> {
        if let Some(ref expected) = self.error {
            return match result {
                Err(e) if full_message(e).contains(expected.as_str()) => Ok(()),
                Err(e) => Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected error containing '{}', got: {}", expected, full_message(e)),
                )),
                Ok(_) => Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected error containing '{}', but step succeeded", expected),
                )),
            };
        }

        if let Some(ref pattern) = self.error_pattern {
            let re = regex_lite::Regex::new(pattern).map_err(|e| {
                ScenarioError::assertion_failed(step, format!("invalid regex pattern: {}", e))
            })?;
            return match result {
                Err(e) if re.is_match(&full_message(e)) => Ok(()),
                Err(e) => Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected error matching '{}', got: {}", pattern, full_message(e)),
                )),
                Ok(_) => Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected error matching '{}', but step succeeded", pattern),
                )),
            };
        }

        let outcome = result.as_ref().map_err(|e| {
            ScenarioError::assertion_failed(step, format!("step failed: {}", full_message(e)))
        })?;

        if let Some(ref custom) = self.custom {
            if !custom(outcome, graph) {
                return Err(ScenarioError::assertion_failed(step, "custom assertion failed"));
            }
        }

        self.verify_counts(step, outcome)?;
        self.verify_receipt(step, outcome, graph)?;
        self.verify_state(step, graph, bindings)
    }

    fn verify_counts(&self, step: &str, outcome: &StepOutcome) -> ScenarioResult<()> {
        if let Some(expected) = self.created {
            if outcome.created != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected {} created, got {}", expected, outcome.created),
                ));
            }
        }

        if let Some(expected) = self.terminated {
            if outcome.terminated != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("expected {} terminated, got {}", expected, outcome.terminated),
                ));
            }
        }

        if self.unchanged && outcome.receipt.tx() != &TxMarker::NoTransaction {
            return Err(ScenarioError::assertion_failed(
                step,
                format!("expected no transaction, got {:?}", outcome.receipt.tx()),
            ));
        }

        Ok(())
    }

    fn verify_receipt(&self, step: &str, outcome: &StepOutcome, graph: &Graph) -> ScenarioResult<()> {
        for name in &self.names {
            match outcome.receipt.user(name) {
                Some(object) if graph.contains(object.uid) => {}
                Some(object) => {
                    return Err(ScenarioError::assertion_failed(
                        step,
                        format!("'{}' names {}, which is not live", name, object.uid),
                    ))
                }
                None => {
                    return Err(ScenarioError::assertion_failed(
                        step,
                        format!("receipt has no entry for '{}'", name),
                    ))
                }
            }
        }

        for name in &self.absent {
            if outcome.receipt.user(name).is_some() {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("receipt unexpectedly names '{}'", name),
                ));
            }
        }

        Ok(())
    }

    fn verify_state(&self, step: &str, graph: &Graph, bindings: &Bindings) -> ScenarioResult<()> {
        let bound = |name: &str| -> Option<Uid> { bindings.get(&Ident::user(name)) };

        for (name, expected) in &self.values {
            let actual = bound(name).and_then(|uid| graph.current_value(uid));
            if actual.as_ref() != Some(expected) {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("'{}': expected value {}, got {:?}", name, expected, actual),
                ));
            }
        }

        for (tag, name) in &self.tags {
            let expected = bound(name);
            let actual = graph.tagged(tag).map(|object| object.uid);
            if expected.is_none() || actual != expected {
                return Err(ScenarioError::assertion_failed(
                    step,
                    format!("tag '{}': expected {:?}, got {:?}", tag, expected, actual),
                ));
            }
        }

        Ok(())
    }
}

/// An error message with its whole source chain.
pub fn full_message(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
