//! Template encoding.
//!
//! A template is a nested wish whose leaves the caller wants back as
//! concrete objects. Encoding names every leaf, minting an identifier where
//! the caller gave none, and records the nesting as a [`Shape`]. The shape
//! is later matched against a receipt to rebuild the same nesting with
//! objects in place of wishes.

use crate::{Endpoint, IdGenerator, Ident, Wish};
use serde::{Deserialize, Serialize};

/// The nesting of a template, with the identifier of each leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Leaf(Ident),
    Seq(Vec<Shape>),
    /// A position that realizes no single object (a fan-out relation, a
    /// raw command, a scalar field value).
    Opaque,
}

impl Shape {
    /// Identifiers of all leaves, depth first.
    pub fn leaves(&self) -> Vec<&Ident> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'s>(&'s self, out: &mut Vec<&'s Ident>) {
        match self {
            Shape::Leaf(id) => out.push(id),
            Shape::Seq(items) => items.iter().for_each(|item| item.collect_leaves(out)),
            Shape::Opaque => {}
        }
    }
}

/// Name every leaf of a template.
///
/// Returns the shape of the template and the wish list to plan. A top-level
/// group is split into its members.
pub fn encode(template: Wish) -> (Shape, Vec<Wish>) {
    let mut ids = IdGenerator::new();
    match template {
        Wish::Group(items) => {
            let (shapes, wishes) = items.into_iter().map(|w| encode_wish(w, &mut ids)).unzip();
            (Shape::Seq(shapes), wishes)
        }
        wish => {
            let (shape, wish) = encode_wish(wish, &mut ids);
            (shape, vec![wish])
        }
    }
}

fn named(name: Option<Ident>, ids: &mut IdGenerator) -> Ident {
    name.unwrap_or_else(|| ids.mint())
}

fn encode_wish(wish: Wish, ids: &mut IdGenerator) -> (Shape, Wish) {
    match wish {
        Wish::Instance { ty, name } => {
            let id = named(name, ids);
            (Shape::Leaf(id.clone()), Wish::Instance { ty, name: Some(id) })
        }
        Wish::Scalar { value, name } => {
            let id = named(name, ids);
            (Shape::Leaf(id.clone()), Wish::Scalar { value, name: Some(id) })
        }
        Wish::Existing { object, value, name } => {
            let id = named(name, ids);
            (
                Shape::Leaf(id.clone()),
                Wish::Existing {
                    object,
                    value,
                    name: Some(id),
                },
            )
        }
        Wish::Delegate { of, name } => {
            let id = named(name, ids);
            (Shape::Leaf(id.clone()), Wish::Delegate { of, name: Some(id) })
        }
        Wish::Ref(id) => (Shape::Leaf(id.clone()), Wish::Ref(id)),
        Wish::ValueNode(value) => (Shape::Leaf(Ident::Value(value.clone())), Wish::ValueNode(value)),
        Wish::Triple {
            source,
            rt,
            name,
            target,
        } => {
            let (source_shape, source) = encode_endpoint(source, ids);
            let (target_shape, target) = encode_endpoint(target, ids);
            let single = matches!((&source, &target), (Endpoint::One(_), Endpoint::One(_)));
            let (relation_shape, name) = if single {
                let id = named(name, ids);
                (Shape::Leaf(id.clone()), Some(id))
            } else {
                (Shape::Opaque, name)
            };
            (
                Shape::Seq(vec![source_shape, relation_shape, target_shape]),
                Wish::Triple {
                    source,
                    rt,
                    name,
                    target,
                },
            )
        }
        Wish::Fields { subject, fields } => {
            let (subject_shape, subject) = encode_wish(*subject, ids);
            let (value_shapes, fields): (Vec<_>, Vec<_>) = fields
                .into_iter()
                .map(|(rt, value)| {
                    let (shape, value) = encode_wish(value, ids);
                    (shape, (rt, value))
                })
                .unzip();
            (
                Shape::Seq(vec![subject_shape, Shape::Seq(value_shapes)]),
                Wish::Fields {
                    subject: Box::new(subject),
                    fields,
                },
            )
        }
        Wish::SetField {
            subject,
            rt,
            value,
            direction,
        } => {
            let (subject_shape, subject) = encode_wish(*subject, ids);
            // A scalar may land in an attribute that already exists.
            let (value_shape, value) = match *value {
                scalar @ Wish::Scalar { .. } => (Shape::Opaque, scalar),
                other => encode_wish(other, ids),
            };
            (
                Shape::Seq(vec![subject_shape, value_shape]),
                Wish::SetField {
                    subject: Box::new(subject),
                    rt,
                    value: Box::new(value),
                    direction,
                },
            )
        }
        Wish::Assign { target, value } => {
            let (shape, target) = encode_wish(*target, ids);
            (
                shape,
                Wish::Assign {
                    target: Box::new(target),
                    value,
                },
            )
        }
        Wish::Tag { target, tag } => {
            let (shape, target) = encode_wish(*target, ids);
            (
                shape,
                Wish::Tag {
                    target: Box::new(target),
                    tag,
                },
            )
        }
        Wish::Terminate { target } => {
            let (shape, target) = encode_wish(*target, ids);
            (
                shape,
                Wish::Terminate {
                    target: Box::new(target),
                },
            )
        }
        Wish::Group(items) => {
            let (shapes, items) = items.into_iter().map(|w| encode_wish(w, ids)).unzip();
            (Shape::Seq(shapes), Wish::Group(items))
        }
        command @ Wish::Command(_) => (Shape::Opaque, command),
    }
}

fn encode_endpoint(endpoint: Endpoint, ids: &mut IdGenerator) -> (Shape, Endpoint) {
    match endpoint {
        Endpoint::One(wish) => {
            let (shape, wish) = encode_wish(*wish, ids);
            (shape, Endpoint::One(Box::new(wish)))
        }
        Endpoint::Many(wishes) => {
            let (shapes, wishes) = wishes.into_iter().map(|w| encode_wish(w, ids)).unzip();
            (Shape::Seq(shapes), Endpoint::Many(wishes))
        }
    }
}
