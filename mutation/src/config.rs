//! Planner configuration.

/// Configuration for [`Planner`](crate::Planner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanConfig {
    /// Upper bound on cull/recombine rounds before giving up.
    pub max_rounds: usize,
    /// Accept bare scalars as relation endpoints, realizing each as a new
    /// attribute of the value's own type. Field values always accept them.
    pub allow_scalar_endpoints: bool,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            max_rounds: 64,
            allow_scalar_endpoints: true,
        }
    }
}

impl PlanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that rejects every scalar outside a field.
    pub fn strict() -> Self {
        Self {
            allow_scalar_endpoints: false,
            ..Self::default()
        }
    }

    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_scalar_endpoints(mut self, allow: bool) -> Self {
        self.allow_scalar_endpoints = allow;
        self
    }
}
