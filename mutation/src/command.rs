//! The primitive command model.
//!
//! A [`Command`] is one primitive mutation intent together with the
//! identifiers it introduces (`produces`) and relies on (`consumes`). Every
//! pipeline stage matches on the command exhaustively, so adding a variant
//! forces each stage to decide how to handle it.
//!
//! Commands serialize as small records with a `kind` discriminator, which is
//! the format used for logging and replay.

use crate::Ident;
use graft_core::{
    DelegateRef, Direction, EntityType, ObjectKind, ObjectRef, RelationType, RepType, Value,
    ValueType,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an Instantiate command creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Atom {
    Entity(EntityType),
    Attribute(ValueType),
    Relation {
        rt: RelationType,
        source: Ident,
        target: Ident,
    },
    Delegate(DelegateRef),
    ValueNode(Value),
}

impl Atom {
    pub fn rep_type(&self) -> Option<RepType> {
        match self {
            Atom::Entity(t) => Some(RepType::Entity(t.clone())),
            Atom::Attribute(t) => Some(RepType::Attribute(t.clone())),
            Atom::Relation { rt, .. } => Some(RepType::Relation(rt.clone())),
            Atom::Delegate(_) | Atom::ValueNode(_) => None,
        }
    }

    /// The structural identifier a delegate or value node is known by.
    pub fn structural_ident(&self) -> Option<Ident> {
        match self {
            Atom::Delegate(d) => Some(Ident::Delegate(d.clone())),
            Atom::ValueNode(v) => Some(Ident::Value(v.clone())),
            Atom::Entity(_) | Atom::Attribute(_) | Atom::Relation { .. } => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Entity(t) => write!(f, "{}", t),
            Atom::Attribute(t) => write!(f, "{}", t),
            Atom::Relation { rt, source, target } => write!(f, "({}, {}, {})", source, rt, target),
            Atom::Delegate(d) => write!(f, "{}", d),
            Atom::ValueNode(v) => write!(f, "value({})", v),
        }
    }
}

/// Where a merged object comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A concrete object from some graph, merged by its origin uid.
    Object(ObjectRef),
    Delegate(DelegateRef),
    Value(Value),
}

impl Origin {
    /// The identifier the merged object is known by.
    pub fn ident(&self) -> Ident {
        match self {
            Origin::Object(object) => Ident::Origin(object.uid),
            Origin::Delegate(d) => Ident::Delegate(d.clone()),
            Origin::Value(v) => Ident::Value(v.clone()),
        }
    }

    pub fn rep_type(&self) -> Option<RepType> {
        match self {
            Origin::Object(object) => object.kind.rep_type(),
            Origin::Delegate(_) | Origin::Value(_) => None,
        }
    }

    /// Object kind handed to the storage engine.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Origin::Object(object) => object.kind.clone(),
            Origin::Delegate(d) => ObjectKind::Delegate(d.clone()),
            Origin::Value(v) => ObjectKind::ValueNode(v.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instantiate {
    pub atom: Atom,
    pub ids: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merge {
    pub origin: Origin,
    pub ids: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assign {
    pub target: Ident,
    pub value: Value,
    /// Implicit assigns (e.g. the carried value of a merged attribute) give
    /// way to explicit ones.
    pub explicit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminate {
    pub target: Ident,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub target: Ident,
    pub tag: String,
}

/// Far end of a field: a value to hold, or an object to point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Value(Value),
    Target(Ident),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetField {
    pub subject: Ident,
    pub rt: RelationType,
    pub value: FieldValue,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub ids: Vec<Ident>,
}

/// Claim that `target` is the source (or target) of the listed relations of
/// type `rt`. An exact claim lists all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub target: Ident,
    pub rt: RelationType,
    pub rel_ids: Vec<Ident>,
    pub exact: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MustLive {
    pub target: Ident,
}

/// A primitive mutation intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Instantiate(Instantiate),
    Merge(Merge),
    Assign(Assign),
    Terminate(Terminate),
    Tag(Tag),
    SetField(SetField),
    Alias(Alias),
    BeSource(Claim),
    BeTarget(Claim),
    MustLive(MustLive),
}

/// Discriminant of a command, for logging and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommandKind {
    Instantiate,
    Merge,
    Assign,
    Terminate,
    Tag,
    SetField,
    Alias,
    BeSource,
    BeTarget,
    MustLive,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Instantiate => "Instantiate",
            CommandKind::Merge => "Merge",
            CommandKind::Assign => "Assign",
            CommandKind::Terminate => "Terminate",
            CommandKind::Tag => "Tag",
            CommandKind::SetField => "SetField",
            CommandKind::Alias => "Alias",
            CommandKind::BeSource => "BeSource",
            CommandKind::BeTarget => "BeTarget",
            CommandKind::MustLive => "MustLive",
        };
        f.write_str(name)
    }
}

/// Which side of a relation a claim is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClaimSide {
    Source,
    Target,
}

/// The logical target a command is about. Two commands sharing a name key
/// are candidates for recombination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NameKey {
    /// Existence of the object: instantiate, merge, terminate, must-live.
    Object(Ident),
    /// The value of an attribute.
    Value(Ident),
    /// One tag on one object.
    Tag(Ident, String),
    /// Relations of one type on one side of an object.
    Claim(ClaimSide, Ident, RelationType),
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Instantiate(_) => CommandKind::Instantiate,
            Command::Merge(_) => CommandKind::Merge,
            Command::Assign(_) => CommandKind::Assign,
            Command::Terminate(_) => CommandKind::Terminate,
            Command::Tag(_) => CommandKind::Tag,
            Command::SetField(_) => CommandKind::SetField,
            Command::Alias(_) => CommandKind::Alias,
            Command::BeSource(_) => CommandKind::BeSource,
            Command::BeTarget(_) => CommandKind::BeTarget,
            Command::MustLive(_) => CommandKind::MustLive,
        }
    }

    /// Constraint commands inform recombination and are never executed.
    pub fn is_constraint(&self) -> bool {
        match self {
            Command::BeSource(_) | Command::BeTarget(_) | Command::MustLive(_) => true,
            Command::Instantiate(_)
            | Command::Merge(_)
            | Command::Assign(_)
            | Command::Terminate(_)
            | Command::Tag(_)
            | Command::SetField(_)
            | Command::Alias(_) => false,
        }
    }

    /// Identifiers this command binds to the object it realizes.
    pub fn produces(&self) -> Vec<Ident> {
        let mut out = match self {
            Command::Instantiate(c) => {
                let mut ids: Vec<Ident> = c.atom.structural_ident().into_iter().collect();
                ids.extend(c.ids.iter().cloned());
                ids
            }
            Command::Merge(c) => {
                let mut ids = vec![c.origin.ident()];
                ids.extend(c.ids.iter().cloned());
                ids
            }
            Command::Assign(_)
            | Command::Terminate(_)
            | Command::Tag(_)
            | Command::SetField(_)
            | Command::Alias(_)
            | Command::BeSource(_)
            | Command::BeTarget(_)
            | Command::MustLive(_) => Vec::new(),
        };
        dedup(&mut out);
        out
    }

    /// Identifiers this command needs resolved before it can run.
    pub fn consumes(&self) -> Vec<Ident> {
        let mut out = match self {
            Command::Instantiate(c) => match &c.atom {
                Atom::Relation { source, target, .. } => vec![source.clone(), target.clone()],
                Atom::Entity(_) | Atom::Attribute(_) | Atom::Delegate(_) | Atom::ValueNode(_) => {
                    Vec::new()
                }
            },
            Command::Merge(c) => match &c.origin {
                Origin::Object(object) => match object.kind.endpoints() {
                    Some((source, target)) => vec![Ident::Origin(source), Ident::Origin(target)],
                    None => Vec::new(),
                },
                Origin::Delegate(_) | Origin::Value(_) => Vec::new(),
            },
            Command::Assign(c) => vec![c.target.clone()],
            Command::Terminate(c) => vec![c.target.clone()],
            Command::Tag(c) => vec![c.target.clone()],
            Command::SetField(c) => match &c.value {
                FieldValue::Target(t) => vec![c.subject.clone(), t.clone()],
                FieldValue::Value(_) => vec![c.subject.clone()],
            },
            Command::Alias(c) => c.ids.clone(),
            Command::BeSource(c) | Command::BeTarget(c) => {
                let mut ids = vec![c.target.clone()];
                ids.extend(c.rel_ids.iter().cloned());
                ids
            }
            Command::MustLive(c) => vec![c.target.clone()],
        };
        dedup(&mut out);
        out
    }

    /// Every identifier mentioned by the command.
    pub fn idents(&self) -> Vec<Ident> {
        let mut out = self.produces();
        out.extend(self.consumes());
        dedup(&mut out);
        out
    }

    /// Keys under which this command may collide with another one.
    pub fn name_keys(&self) -> Vec<NameKey> {
        match self {
            Command::Instantiate(_) | Command::Merge(_) => {
                self.produces().into_iter().map(NameKey::Object).collect()
            }
            Command::Terminate(c) => vec![NameKey::Object(c.target.clone())],
            Command::MustLive(c) => vec![NameKey::Object(c.target.clone())],
            Command::Assign(c) => vec![NameKey::Value(c.target.clone())],
            Command::Tag(c) => vec![NameKey::Tag(c.target.clone(), c.tag.clone())],
            Command::BeSource(c) => {
                vec![NameKey::Claim(ClaimSide::Source, c.target.clone(), c.rt.clone())]
            }
            Command::BeTarget(c) => {
                vec![NameKey::Claim(ClaimSide::Target, c.target.clone(), c.rt.clone())]
            }
            Command::SetField(_) | Command::Alias(_) => Vec::new(),
        }
    }

    /// Rewrite every identifier through `f`, dropping duplicates that the
    /// rewrite introduces in identifier lists.
    pub fn map_idents(self, f: &impl Fn(&Ident) -> Ident) -> Command {
        let list = |ids: Vec<Ident>| {
            let mut out: Vec<Ident> = ids.iter().map(f).collect();
            dedup(&mut out);
            out
        };
        match self {
            Command::Instantiate(c) => {
                let atom = match c.atom {
                    Atom::Relation { rt, source, target } => Atom::Relation {
                        rt,
                        source: f(&source),
                        target: f(&target),
                    },
                    other => other,
                };
                let mut ids = list(c.ids);
                if let Some(own) = atom.structural_ident() {
                    ids.retain(|id| *id != own);
                }
                Command::Instantiate(Instantiate { atom, ids })
            }
            Command::Merge(c) => {
                let own = c.origin.ident();
                let mut ids = list(c.ids);
                ids.retain(|id| *id != own);
                Command::Merge(Merge {
                    origin: c.origin,
                    ids,
                })
            }
            Command::Assign(c) => Command::Assign(Assign {
                target: f(&c.target),
                ..c
            }),
            Command::Terminate(c) => Command::Terminate(Terminate {
                target: f(&c.target),
            }),
            Command::Tag(c) => Command::Tag(Tag {
                target: f(&c.target),
                tag: c.tag,
            }),
            Command::SetField(c) => Command::SetField(SetField {
                subject: f(&c.subject),
                value: match c.value {
                    FieldValue::Target(t) => FieldValue::Target(f(&t)),
                    value @ FieldValue::Value(_) => value,
                },
                ..c
            }),
            Command::Alias(c) => Command::Alias(Alias { ids: list(c.ids) }),
            Command::BeSource(c) => Command::BeSource(map_claim(c, f)),
            Command::BeTarget(c) => Command::BeTarget(map_claim(c, f)),
            Command::MustLive(c) => Command::MustLive(MustLive {
                target: f(&c.target),
            }),
        }
    }
}

fn map_claim(claim: Claim, f: &impl Fn(&Ident) -> Ident) -> Claim {
    let mut rel_ids: Vec<Ident> = claim.rel_ids.iter().map(f).collect();
    dedup(&mut rel_ids);
    Claim {
        target: f(&claim.target),
        rel_ids,
        ..claim
    }
}

/// Remove repeated identifiers, keeping first occurrences in order.
pub(crate) fn dedup(ids: &mut Vec<Ident>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Instantiate(c) => write!(f, "Instantiate({}) as {}", c.atom, join(&c.ids)),
            Command::Merge(c) => write!(f, "Merge({}) as {}", c.origin.ident(), join(&c.ids)),
            Command::Assign(c) => {
                let how = if c.explicit { "" } else { " (implicit)" };
                write!(f, "Assign({} <- {}){}", c.target, c.value, how)
            }
            Command::Terminate(c) => write!(f, "Terminate({})", c.target),
            Command::Tag(c) => write!(f, "Tag({}, {:?})", c.target, c.tag),
            Command::SetField(c) => write!(f, "SetField({}, {}, {:?})", c.subject, c.rt, c.direction),
            Command::Alias(c) => write!(f, "Alias({})", join(&c.ids)),
            Command::BeSource(c) => write!(f, "BeSource({}, {}, [{}])", c.target, c.rt, join(&c.rel_ids)),
            Command::BeTarget(c) => write!(f, "BeTarget({}, {}, [{}])", c.target, c.rt, join(&c.rel_ids)),
            Command::MustLive(c) => write!(f, "MustLive({})", c.target),
        }
    }
}

fn join(ids: &[Ident]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
