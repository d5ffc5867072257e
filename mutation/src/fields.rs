//! Expansion of single-valued fields into primitive commands.
//!
//! A field says "the subject has exactly this `rt` relation". Against an
//! existing subject the expansion is the smallest change that makes it true:
//! a relation already pointing at the wanted value is kept, an attribute that
//! can hold the value is re-assigned, and only otherwise is a new relation
//! created. Every other relation of that type is terminated.

use crate::{Assign, Atom, Claim, Command, FieldValue, IdGenerator, Ident, Instantiate, MustLive, SetField, Terminate};
use graft_core::{Direction, GraphView, ObjectKind, RelationInfo, Uid, Value, ValueType};

pub(crate) fn expand(
    field: SetField,
    view: &dyn GraphView,
    resolve: impl Fn(&Ident) -> Option<Uid>,
    ids: &mut IdGenerator,
) -> Vec<Command> {
    let existing = resolve(&field.subject)
        .map(|uid| view.relations(uid, &field.rt, field.direction))
        .unwrap_or_default();
    let mut out = Vec::new();

    let kept = match &field.value {
        FieldValue::Target(target) => {
            let target_uid = resolve(target);
            existing
                .iter()
                .find(|rel| target_uid == Some(rel.far_end(field.direction)))
                .map(|rel| rel.uid)
        }
        FieldValue::Value(value) => {
            let holding = existing
                .iter()
                .find(|rel| holds(view, rel, field.direction, value));
            let accepting = || {
                existing
                    .iter()
                    .find(|rel| accepts(view, rel, field.direction, value))
            };
            match holding {
                Some(rel) => Some(rel.uid),
                None => accepting().map(|rel| {
                    out.push(Command::Assign(Assign {
                        target: Ident::Origin(rel.far_end(field.direction)),
                        value: value.clone(),
                        explicit: true,
                    }));
                    rel.uid
                }),
            }
        }
    };

    let rel_id = match kept {
        Some(uid) => Ident::Origin(uid),
        None => {
            let far = match &field.value {
                FieldValue::Target(target) => target.clone(),
                FieldValue::Value(value) => {
                    let attr = ids.mint();
                    out.push(Command::Instantiate(Instantiate {
                        atom: Atom::Attribute(ValueType::of(value)),
                        ids: vec![attr.clone()],
                    }));
                    out.push(Command::Assign(Assign {
                        target: attr.clone(),
                        value: value.clone(),
                        explicit: true,
                    }));
                    attr
                }
            };
            let id = ids.mint();
            let (source, target) = match field.direction {
                Direction::Outgoing => (field.subject.clone(), far),
                Direction::Incoming => (far, field.subject.clone()),
            };
            out.push(Command::Instantiate(Instantiate {
                atom: Atom::Relation {
                    rt: field.rt.clone(),
                    source,
                    target,
                },
                ids: vec![id.clone()],
            }));
            id
        }
    };

    for rel in existing.iter().filter(|rel| Some(rel.uid) != kept) {
        out.push(Command::Terminate(Terminate {
            target: Ident::Origin(rel.uid),
        }));
    }

    let claim = Claim {
        target: field.subject.clone(),
        rt: field.rt,
        rel_ids: vec![rel_id],
        exact: true,
    };
    out.push(match field.direction {
        Direction::Outgoing => Command::BeSource(claim),
        Direction::Incoming => Command::BeTarget(claim),
    });
    out.push(Command::MustLive(MustLive {
        target: field.subject,
    }));
    out
}

/// The relation's far end is an attribute already holding `value`.
fn holds(view: &dyn GraphView, rel: &RelationInfo, direction: Direction, value: &Value) -> bool {
    let far = rel.far_end(direction);
    match view.object(far).map(|o| o.kind) {
        Some(ObjectKind::Attribute(vt)) => vt
            .coerce(value)
            .is_some_and(|stored| view.current_value(far) == Some(stored)),
        _ => false,
    }
}

fn accepts(view: &dyn GraphView, rel: &RelationInfo, direction: Direction, value: &Value) -> bool {
    matches!(
        view.object(rel.far_end(direction)).map(|o| o.kind),
        Some(ObjectKind::Attribute(vt)) if vt.accepts(value)
    )
}
