//! Indexes for efficient graph lookups.

use graft_core::{DelegateRef, Uid, Value};
use std::collections::HashMap;

/// Adjacency index: object -> relations leaving it / arriving at it.
///
/// Relations are kept in creation order so that field queries are
/// deterministic.
#[derive(Debug, Default)]
pub struct AdjacencyIndex {
    /// Relations where the object is the source
    outbound: HashMap<Uid, Vec<Uid>>,
    /// Relations where the object is the target
    inbound: HashMap<Uid, Vec<Uid>>,
}

impl AdjacencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, relation: Uid, source: Uid, target: Uid) {
        self.outbound.entry(source).or_default().push(relation);
        self.inbound.entry(target).or_default().push(relation);
    }

    pub fn remove(&mut self, relation: Uid, source: Uid, target: Uid) {
        Self::remove_from(&mut self.outbound, source, relation);
        Self::remove_from(&mut self.inbound, target, relation);
    }

    fn remove_from(index: &mut HashMap<Uid, Vec<Uid>>, key: Uid, relation: Uid) {
        if let Some(list) = index.get_mut(&key) {
            list.retain(|r| *r != relation);
            if list.is_empty() {
                index.remove(&key);
            }
        }
    }

    /// Relations whose source is the object.
    pub fn outgoing(&self, uid: Uid) -> impl Iterator<Item = Uid> + '_ {
        self.outbound
            .get(&uid)
            .into_iter()
            .flat_map(|list| list.iter().copied())
    }

    /// Relations whose target is the object.
    pub fn incoming(&self, uid: Uid) -> impl Iterator<Item = Uid> + '_ {
        self.inbound
            .get(&uid)
            .into_iter()
            .flat_map(|list| list.iter().copied())
    }

    /// All relations attached to the object, outgoing first.
    pub fn involving(&self, uid: Uid) -> impl Iterator<Item = Uid> + '_ {
        self.outgoing(uid).chain(self.incoming(uid))
    }
}

/// Structural index: delegates and value nodes are singletons per graph.
#[derive(Debug, Default)]
pub struct StructuralIndex {
    delegates: HashMap<DelegateRef, Uid>,
    values: HashMap<Value, Uid>,
}

impl StructuralIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_delegate(&mut self, delegate: DelegateRef, uid: Uid) {
        self.delegates.insert(delegate, uid);
    }

    pub fn remove_delegate(&mut self, delegate: &DelegateRef) {
        self.delegates.remove(delegate);
    }

    pub fn delegate(&self, delegate: &DelegateRef) -> Option<Uid> {
        self.delegates.get(delegate).copied()
    }

    pub fn insert_value(&mut self, value: Value, uid: Uid) {
        self.values.insert(value, uid);
    }

    pub fn remove_value(&mut self, value: &Value) {
        self.values.remove(value);
    }

    pub fn value(&self, value: &Value) -> Option<Uid> {
        self.values.get(value).copied()
    }
}

/// Tag index: tag name -> the one object carrying it.
#[derive(Debug, Default)]
pub struct TagIndex {
    tags: HashMap<String, Uid>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the tag at `uid`, returning the object it previously named.
    pub fn attach(&mut self, tag: &str, uid: Uid) -> Option<Uid> {
        self.tags.insert(tag.to_string(), uid)
    }

    /// Restore a tag to a previous holder (or remove it).
    pub fn restore(&mut self, tag: &str, previous: Option<Uid>) {
        match previous {
            Some(uid) => {
                self.tags.insert(tag.to_string(), uid);
            }
            None => {
                self.tags.remove(tag);
            }
        }
    }

    pub fn get(&self, tag: &str) -> Option<Uid> {
        self.tags.get(tag).copied()
    }
}
