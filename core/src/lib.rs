//! Graft Core Types
//!
//! This crate provides the foundational types shared by the planner and the
//! storage engine:
//! - Identity types (GraphUid, Uid, SliceId, ContextId)
//! - Representation types (EntityType, RelationType, ValueType, DelegateRef)
//! - Value types (the Value enum with all scalar types)
//! - Object descriptors (ObjectKind, ObjectRef, RelationInfo)
//! - The graph primitive boundary (GraphView, GraphStore)
//! - Common error types

mod error;
mod id;
mod object;
mod store;
mod types;
mod value;

pub use error::*;
pub use id::*;
pub use object::*;
pub use store::*;
pub use types::*;
pub use value::*;
