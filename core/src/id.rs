//! Identity types for stored objects.
//!
//! Every object on a graph carries an origin [`Uid`]: the uid of the graph
//! that first created it plus a local index on that graph. Objects merged in
//! from another graph keep their foreign uid, so the same object has the same
//! identity everywhere it lives.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphUid(pub u64);

impl GraphUid {
    /// Create a new GraphUid from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Draw a fresh random graph uid.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Get the raw value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GraphUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{:016x}", self.0)
    }
}

/// Origin identity of an object: the graph that created it and its index there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid {
    pub graph: GraphUid,
    pub index: u64,
}

impl Uid {
    pub fn new(graph: GraphUid, index: u64) -> Self {
        Self { graph, index }
    }

    /// Returns true if the object was created on the given graph.
    pub fn is_native_to(&self, graph: GraphUid) -> bool {
        self.graph == graph
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.graph, self.index)
    }
}

/// A committed time slice of a graph. Slice 0 is the empty genesis state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SliceId(pub u64);

impl SliceId {
    pub const GENESIS: SliceId = SliceId(0);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// The slice that the next commit will create.
    pub fn next(&self) -> SliceId {
        SliceId(self.0 + 1)
    }
}

impl fmt::Display for SliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A logical thread of control that may hold a graph's transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u64);

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_CONTEXT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

impl ContextId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocate a context id no other thread or task has been given.
    pub fn fresh() -> Self {
        Self(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The context of the calling thread, allocated on first use.
    pub fn current() -> Self {
        CURRENT_CONTEXT.with(|slot| match slot.get() {
            Some(ctx) => ctx,
            None => {
                let ctx = Self::fresh();
                slot.set(Some(ctx));
                ctx
            }
        })
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}
