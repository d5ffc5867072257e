//! Graft Graph Storage
//!
//! This crate provides a versioned in-memory graph store with indexed access:
//! - Object storage with birth and termination slices
//! - Adjacency index: find relations from/to an object
//! - Structural index: find delegates and value nodes
//! - Tag index: unique tag names per graph
//! - Undo log for aborting transactions
//! - Transaction holder tracking (one context per graph, nestable)

mod graph;
mod holder;
mod index;
mod undo;

pub use graph::*;
pub use holder::HolderState;
