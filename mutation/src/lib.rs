//! Graft Mutation Planner
//!
//! Turn a list of wishes into an ordered list of primitive commands.
//!
//! Responsibilities:
//! - Resolve the identifiers a wish list declares and references
//! - Compile nested wishes into primitive commands
//! - Cull commands the current graph state already satisfies
//! - Recombine commands that describe the same object
//! - Order the remaining commands by their dependencies
//!
//! # Module Structure
//!
//! - `ident` - Identifiers, bindings and the identifier generator
//! - `command` - The primitive command model
//! - `wish` - High-level wish expressions
//! - `resolver` - Identifier resolution and static validation
//! - `compiler` - Worklist compiler from wishes to commands
//! - `fields` - Minimal-change expansion of set-field commands
//! - `cull` - Redundancy elimination against a graph snapshot
//! - `alias` - Union-find over identifiers
//! - `recombine` - Merging of colliding commands
//! - `order` - Dependency ordering
//! - `template` - Naming the leaves of nested templates
//! - `planner` - The full pipeline
//! - `config` - Planner configuration
//! - `error` - Error types for planning failures

mod alias;
mod command;
mod compiler;
mod config;
mod cull;
mod error;
mod fields;
mod ident;
mod order;
mod planner;
mod recombine;
mod resolver;
mod template;
mod wish;

pub use alias::AliasMap;
pub use command::{
    Alias, Assign, Atom, Claim, ClaimSide, Command, CommandKind, FieldValue, Instantiate, Merge,
    MustLive, NameKey, Origin, SetField, Tag, Terminate,
};
pub use config::PlanConfig;
pub use cull::{Culled, Culler};
pub use error::{
    ConflictError, OrderingError, PlanError, PlanResult, StuckCommand, ValidationError,
};
pub use ident::{Bindings, IdGenerator, Ident, GENERATED_PREFIX, RECEIPT_TX_KEY};
pub use order::order;
pub use planner::{Plan, Planner};
pub use recombine::{recombine, recombine_all, Recombined};
pub use resolver::{resolve, Declaration, Definitions};
pub use template::{encode, Shape};
pub use wish::{Endpoint, Wish};
