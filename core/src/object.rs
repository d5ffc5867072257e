//! Descriptors of objects living on a graph.

use crate::{DelegateRef, EntityType, RelationType, RepType, SliceId, Uid, Value, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of object a uid denotes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Entity(EntityType),
    Attribute(ValueType),
    Relation {
        rt: RelationType,
        source: Uid,
        target: Uid,
    },
    Delegate(DelegateRef),
    ValueNode(Value),
    /// The marker object a committed transaction leaves behind.
    TxMarker,
}

impl ObjectKind {
    /// The representation type of an instance object, if it is one.
    pub fn rep_type(&self) -> Option<RepType> {
        match self {
            ObjectKind::Entity(t) => Some(RepType::Entity(t.clone())),
            ObjectKind::Attribute(t) => Some(RepType::Attribute(t.clone())),
            ObjectKind::Relation { rt, .. } => Some(RepType::Relation(rt.clone())),
            ObjectKind::Delegate(_) | ObjectKind::ValueNode(_) | ObjectKind::TxMarker => None,
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, ObjectKind::Relation { .. })
    }

    /// Endpoints of a relation object.
    pub fn endpoints(&self) -> Option<(Uid, Uid)> {
        match self {
            ObjectKind::Relation { source, target, .. } => Some((*source, *target)),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Entity(t) => write!(f, "{}", t),
            ObjectKind::Attribute(t) => write!(f, "{}", t),
            ObjectKind::Relation { rt, source, target } => {
                write!(f, "({} -{}-> {})", source, rt, target)
            }
            ObjectKind::Delegate(d) => write!(f, "{}", d),
            ObjectKind::ValueNode(v) => write!(f, "value({})", v),
            ObjectKind::TxMarker => write!(f, "TX"),
        }
    }
}

/// A concrete object as seen from one slice of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub uid: Uid,
    pub kind: ObjectKind,
    /// The slice this reference was resolved in.
    pub slice: SliceId,
}

impl ObjectRef {
    pub fn new(uid: Uid, kind: ObjectKind, slice: SliceId) -> Self {
        Self { uid, kind, slice }
    }

    /// The same object viewed from another slice.
    pub fn at(mut self, slice: SliceId) -> Self {
        self.slice = slice;
        self
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.kind, self.uid, self.slice)
    }
}

/// Which end of a relation a field is attached at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// The subject is the relation's source.
    Outgoing,
    /// The subject is the relation's target.
    Incoming,
}

/// A live relation as reported by adjacency queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationInfo {
    pub uid: Uid,
    pub rt: RelationType,
    pub source: Uid,
    pub target: Uid,
}

impl RelationInfo {
    /// The endpoint opposite to the subject for the given direction.
    pub fn far_end(&self, direction: Direction) -> Uid {
        match direction {
            Direction::Outgoing => self.target,
            Direction::Incoming => self.source,
        }
    }
}
