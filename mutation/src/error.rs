//! Planning error types.
//!
//! Errors come in three families, one per planning phase: validation of the
//! input, conflicts found while merging commands, and ordering failures.

use crate::{Command, CommandKind, Ident};
use graft_core::{RelationType, Value};
use std::fmt;
use thiserror::Error;

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors that can occur while planning a wish list.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Ordering(#[from] OrderingError),
}

impl PlanError {
    pub fn is_validation(&self) -> bool {
        matches!(self, PlanError::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PlanError::Conflict(_))
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, PlanError::Ordering(_))
    }
}

/// The input is malformed. Raised before any command is emitted.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing definition: {ident} is referenced but never defined")]
    MissingDefinition { ident: Ident },

    #[error("Conflicting declaration of {ident}: {first} and {second}")]
    ConflictingDeclaration {
        ident: Ident,
        first: String,
        second: String,
    },

    #[error("Malformed relation template: {message}")]
    MalformedTemplate { message: String },

    #[error("Nested list in {position} is not allowed")]
    NestedList { position: String },

    #[error("Ambiguous bare scalar {value}: wrap it in an attribute instance")]
    AmbiguousScalar { value: Value },

    #[error("Bare relation type {rt} used without a source and target")]
    BareRelationType { rt: RelationType },

    #[error("Value {value} does not fit {ident} of type {expected}")]
    ValueTypeMismatch {
        ident: Ident,
        expected: String,
        value: Value,
    },

    #[error("{kind} commands are internal and cannot be submitted")]
    InternalCommand { kind: CommandKind },

    #[error("A {what} cannot appear as {position}")]
    InvalidPosition { what: String, position: String },

    #[error("Identifier {name:?} is reserved")]
    ReservedIdent { name: String },
}

impl ValidationError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            message: message.into(),
        }
    }

    pub fn nested_list(position: impl Into<String>) -> Self {
        Self::NestedList {
            position: position.into(),
        }
    }

    pub fn invalid_position(what: impl Into<String>, position: impl Into<String>) -> Self {
        Self::InvalidPosition {
            what: what.into(),
            position: position.into(),
        }
    }
}

/// Two commands make incompatible demands on the same target.
#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("Conflicting assigns to {ident}: {first} and {second}")]
    AssignConflict {
        ident: Ident,
        first: Value,
        second: Value,
    },

    #[error("{ident} is both required to exist and terminated")]
    InstantiateTerminate { ident: Ident },

    #[error("{ident} is {existing} but is required to be {requested}")]
    TypeMismatch {
        ident: Ident,
        existing: String,
        requested: String,
    },

    #[error("Relation {ident} declared as both {first} and {second}")]
    RelationTypeMismatch {
        ident: Ident,
        first: RelationType,
        second: RelationType,
    },

    #[error("{first} and {second} are distinct objects and cannot be the same")]
    DistinctOrigins { first: Ident, second: Ident },

    #[error("Plan did not settle after {rounds} rounds")]
    Unsettled { rounds: usize },
}

impl ConflictError {
    pub fn type_mismatch(
        ident: Ident,
        existing: impl Into<String>,
        requested: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            ident,
            existing: existing.into(),
            requested: requested.into(),
        }
    }
}

/// The surviving commands admit no valid execution order.
#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("{} commands cannot be ordered: {}", .stuck.len(), list(.stuck))]
    Cycle { stuck: Vec<StuckCommand> },
}

/// A command the orderer could not schedule, with what it waited for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StuckCommand {
    pub command: Command,
    pub unmet: Vec<Ident>,
}

impl fmt::Display for StuckCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unmet: Vec<String> = self.unmet.iter().map(ToString::to_string).collect();
        write!(f, "{} waiting on [{}]", self.command, unmet.join(", "))
    }
}

fn list(stuck: &[StuckCommand]) -> String {
    stuck
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
