//! Wish expressions: what a caller wants the graph to look like.
//!
//! Wishes are partially specified and may nest. The expression compiler
//! flattens them into primitive [`Command`]s.

use crate::{Command, Ident};
use graft_core::{DelegateRef, Direction, EntityType, ObjectRef, RelationType, RepType, Value, ValueType};
use serde::{Deserialize, Serialize};

/// One high-level mutation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wish {
    /// A new instance of an entity or attribute type, e.g. `ET.Person['p1']`.
    Instance { ty: RepType, name: Option<Ident> },
    /// A bare value. Only meaningful where an attribute can be inferred.
    Scalar { value: Value, name: Option<Ident> },
    /// An object named elsewhere in the wish list, or pre-bound.
    Ref(Ident),
    /// A concrete object, merged by its origin. An attribute may carry the
    /// value it held when it was read.
    Existing {
        object: ObjectRef,
        value: Option<Value>,
        name: Option<Ident>,
    },
    /// The delegate node of a representation type.
    Delegate { of: DelegateRef, name: Option<Ident> },
    /// The value node holding a value.
    ValueNode(Value),
    /// A relation, or with list endpoints a fan-out of relations.
    Triple {
        source: Endpoint,
        rt: RelationType,
        name: Option<Ident>,
        target: Endpoint,
    },
    /// A subject with one relation per field.
    Fields {
        subject: Box<Wish>,
        fields: Vec<(RelationType, Wish)>,
    },
    /// Make `rt` in `direction` hold exactly `value`.
    SetField {
        subject: Box<Wish>,
        rt: RelationType,
        value: Box<Wish>,
        direction: Direction,
    },
    Assign { target: Box<Wish>, value: Value },
    Tag { target: Box<Wish>, tag: String },
    Terminate { target: Box<Wish> },
    /// A nested list of wishes.
    Group(Vec<Wish>),
    /// A primitive command passed through as is.
    Command(Command),
}

/// Source or target of a triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    One(Box<Wish>),
    Many(Vec<Wish>),
}

impl Endpoint {
    pub fn iter(&self) -> std::slice::Iter<'_, Wish> {
        match self {
            Endpoint::One(wish) => std::slice::from_ref(wish.as_ref()).iter(),
            Endpoint::Many(wishes) => wishes.iter(),
        }
    }
}

impl From<Wish> for Endpoint {
    fn from(wish: Wish) -> Self {
        Endpoint::One(Box::new(wish))
    }
}

impl From<Vec<Wish>> for Endpoint {
    fn from(wishes: Vec<Wish>) -> Self {
        Endpoint::Many(wishes)
    }
}

impl Wish {
    pub fn entity(ty: impl Into<String>) -> Self {
        Wish::Instance {
            ty: RepType::Entity(EntityType::new(ty)),
            name: None,
        }
    }

    pub fn attribute(ty: ValueType) -> Self {
        Wish::Instance {
            ty: RepType::Attribute(ty),
            name: None,
        }
    }

    pub fn scalar(value: impl Into<Value>) -> Self {
        Wish::Scalar {
            value: value.into(),
            name: None,
        }
    }

    pub fn reference(id: impl Into<Ident>) -> Self {
        Wish::Ref(id.into())
    }

    pub fn existing(object: ObjectRef) -> Self {
        Wish::Existing {
            object,
            value: None,
            name: None,
        }
    }

    pub fn delegate(of: impl Into<RepType>) -> Self {
        Wish::Delegate {
            of: DelegateRef::new(of),
            name: None,
        }
    }

    pub fn value_node(value: impl Into<Value>) -> Self {
        Wish::ValueNode(value.into())
    }

    pub fn triple(
        source: impl Into<Endpoint>,
        rt: impl Into<RelationType>,
        target: impl Into<Endpoint>,
    ) -> Self {
        Wish::Triple {
            source: source.into(),
            rt: rt.into(),
            name: None,
            target: target.into(),
        }
    }

    pub fn fields<R: Into<RelationType>>(
        subject: Wish,
        fields: impl IntoIterator<Item = (R, Wish)>,
    ) -> Self {
        Wish::Fields {
            subject: Box::new(subject),
            fields: fields.into_iter().map(|(rt, w)| (rt.into(), w)).collect(),
        }
    }

    pub fn set_field(subject: Wish, rt: impl Into<RelationType>, value: Wish) -> Self {
        Wish::SetField {
            subject: Box::new(subject),
            rt: rt.into(),
            value: Box::new(value),
            direction: Direction::Outgoing,
        }
    }

    pub fn assign(target: Wish, value: impl Into<Value>) -> Self {
        Wish::Assign {
            target: Box::new(target),
            value: value.into(),
        }
    }

    pub fn tag(target: Wish, tag: impl Into<String>) -> Self {
        Wish::Tag {
            target: Box::new(target),
            tag: tag.into(),
        }
    }

    pub fn terminate(target: Wish) -> Self {
        Wish::Terminate {
            target: Box::new(target),
        }
    }

    pub fn group(wishes: impl IntoIterator<Item = Wish>) -> Self {
        Wish::Group(wishes.into_iter().collect())
    }

    pub fn command(command: Command) -> Self {
        Wish::Command(command)
    }

    /// Give the object this wish realizes a name.
    ///
    /// Instances, scalars, existing objects, delegates and triples take the
    /// name. Every other wish returns unchanged: a `Ref` already is a name,
    /// a `ValueNode` is always known by its value, and the remaining
    /// variants do not realize a single object. Name the object where it is
    /// declared instead.
    pub fn named(mut self, id: impl Into<Ident>) -> Self {
        let id = id.into();
        match &mut self {
            Wish::Instance { name, .. }
            | Wish::Scalar { name, .. }
            | Wish::Existing { name, .. }
            | Wish::Delegate { name, .. }
            | Wish::Triple { name, .. } => *name = Some(id),
            Wish::Ref(_)
            | Wish::ValueNode(_)
            | Wish::Fields { .. }
            | Wish::SetField { .. }
            | Wish::Assign { .. }
            | Wish::Tag { .. }
            | Wish::Terminate { .. }
            | Wish::Group(_)
            | Wish::Command(_) => {}
        }
        self
    }

    /// Incoming variant of a field wish.
    pub fn incoming(mut self) -> Self {
        if let Wish::SetField { direction, .. } = &mut self {
            *direction = Direction::Incoming;
        }
        self
    }

    /// Short label for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Wish::Instance { .. } => "instance",
            Wish::Scalar { .. } => "scalar",
            Wish::Ref(_) => "reference",
            Wish::Existing { .. } => "existing object",
            Wish::Delegate { .. } => "delegate",
            Wish::ValueNode(_) => "value node",
            Wish::Triple { .. } => "triple",
            Wish::Fields { .. } => "fields",
            Wish::SetField { .. } => "set-field",
            Wish::Assign { .. } => "assign",
            Wish::Tag { .. } => "tag",
            Wish::Terminate { .. } => "terminate",
            Wish::Group(_) => "group",
            Wish::Command(_) => "command",
        }
    }
}
