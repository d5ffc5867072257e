//! Graft Transaction
//!
//! Apply planned commands to a graph as one atomic transaction.
//!
//! Responsibilities:
//! - Hold a graph's transaction for the duration of an execution
//! - Apply ordered commands through the graph primitives
//! - Roll back on any failure
//! - Report what every identifier resolved to
//!
//! # Module Structure
//!
//! - `scope` - RAII transaction scope that aborts unless committed
//! - `executor` - Applies a plan inside a scope
//! - `receipt` - Identifier to object mapping, template unpacking
//! - `transact` - Plan-and-execute entry points
//! - `config` - Entry point configuration
//! - `error` - Error types for transaction failures

mod config;
mod error;
mod executor;
mod receipt;
mod scope;
mod transact;

pub use config::TransactConfig;
pub use error::{ExecutionError, ExecutionResult, TransactionError, TransactionResult};
pub use executor::Executor;
pub use receipt::{Receipt, TxMarker, Unpacked};
pub use scope::TransactionScope;
pub use transact::{transact, transact_template, transact_with};
