//! Representation types.
//!
//! Every object on a graph is an instance of a representation type: an
//! entity type (`ET.Person`), an attribute value type (`AET.String`) or a
//! relation type (`RT.Owns`). Delegates are the type-level nodes standing for
//! a representation type itself.

use crate::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an entity type, displayed as `ET.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityType(pub String);

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ET.{}", self.0)
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Name of a relation type, displayed as `RT.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationType(pub String);

impl RelationType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RT.{}", self.0)
    }
}

impl From<&str> for RelationType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Value type of an attribute entity, displayed as `AET.<type>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    Timestamp,
    /// Enumeration values of the named enum type.
    Enum(String),
}

/// 2^63: floats at or beyond it saturate when cast to `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl ValueType {
    /// The attribute type a bare scalar is stored as.
    pub fn of(value: &Value) -> ValueType {
        match value {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Enum { enum_type, .. } => ValueType::Enum(enum_type.clone()),
        }
    }

    /// Convert a value into the representation stored under this type.
    ///
    /// Ints are accepted by Float (when exactly representable) and by Bool
    /// (0 and 1 only); Bools are accepted by Int. Everything else must match
    /// exactly. Returns `None` when the value cannot be stored.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ValueType::Bool, Value::Bool(_))
            | (ValueType::Int, Value::Int(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::String, Value::String(_))
            | (ValueType::Timestamp, Value::Timestamp(_)) => Some(value.clone()),
            (ValueType::Enum(name), Value::Enum { enum_type, .. }) if name == enum_type => {
                Some(value.clone())
            }
            (ValueType::Float, Value::Int(i)) => {
                let f = *i as f64;
                let exact = f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f) && f as i64 == *i;
                exact.then_some(Value::Float(f))
            }
            (ValueType::Int, Value::Bool(b)) => Some(Value::Int(i64::from(*b))),
            (ValueType::Bool, Value::Int(0)) => Some(Value::Bool(false)),
            (ValueType::Bool, Value::Int(1)) => Some(Value::Bool(true)),
            _ => None,
        }
    }

    /// Returns true if a value can be assigned to an attribute of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        self.coerce(value).is_some()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "AET.Bool"),
            ValueType::Int => write!(f, "AET.Int"),
            ValueType::Float => write!(f, "AET.Float"),
            ValueType::String => write!(f, "AET.String"),
            ValueType::Timestamp => write!(f, "AET.Timestamp"),
            ValueType::Enum(name) => write!(f, "AET.Enum.{}", name),
        }
    }
}

/// Any representation type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RepType {
    Entity(EntityType),
    Attribute(ValueType),
    Relation(RelationType),
}

impl RepType {
    pub fn entity(name: impl Into<String>) -> Self {
        RepType::Entity(EntityType::new(name))
    }

    pub fn relation(name: impl Into<String>) -> Self {
        RepType::Relation(RelationType::new(name))
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, RepType::Relation(_))
    }
}

impl fmt::Display for RepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepType::Entity(t) => write!(f, "{}", t),
            RepType::Attribute(t) => write!(f, "{}", t),
            RepType::Relation(t) => write!(f, "{}", t),
        }
    }
}

impl From<EntityType> for RepType {
    fn from(t: EntityType) -> Self {
        RepType::Entity(t)
    }
}

impl From<ValueType> for RepType {
    fn from(t: ValueType) -> Self {
        RepType::Attribute(t)
    }
}

impl From<RelationType> for RepType {
    fn from(t: RelationType) -> Self {
        RepType::Relation(t)
    }
}

/// Reference to the delegate (type-level node) of a representation type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DelegateRef(pub RepType);

impl DelegateRef {
    pub fn new(of: impl Into<RepType>) -> Self {
        Self(of.into())
    }

    pub fn of(&self) -> &RepType {
        &self.0
    }
}

impl fmt::Display for DelegateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delegate({})", self.0)
    }
}
