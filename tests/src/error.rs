//! Error types for scenario runs.

use thiserror::Error;

/// Errors raised while running a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A step's outcome did not match its assertion.
    #[error("step '{step}': {message}")]
    AssertionFailed { step: String, message: String },

    /// A serialized command list could not be read.
    #[error("step '{step}': cannot replay commands: {message}")]
    Replay { step: String, message: String },

    /// The scenario has no step of this name.
    #[error("unknown step '{0}'")]
    UnknownStep(String),
}

impl ScenarioError {
    pub fn assertion_failed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn replay(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Replay {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Result type for scenario runs.
pub type ScenarioResult<T> = Result<T, ScenarioError>;
