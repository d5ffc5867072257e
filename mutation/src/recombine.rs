//! Recombination: merging commands about the same logical target.
//!
//! Two commands that share a [`NameKey`](crate::NameKey) either merge into a single command
//! (plus [`Alias`] commands reconciling their secondary references), stay
//! side by side, or conflict.

use crate::command::dedup;
use crate::error::{ConflictError, PlanResult};
use crate::{Alias, Assign, Atom, Claim, Command, Ident, Instantiate, Merge};
use graft_core::ObjectKind;
use std::collections::{HashSet, VecDeque};
use tracing::{trace, warn};

/// Result of recombining two commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recombined {
    /// The commands can coexist as they are.
    Unchanged,
    /// The commands are replaced. At most one replacement command carries a
    /// name key; the others are aliases.
    Merged(Vec<Command>),
}

/// Recombine two commands known to share a name key. `a` comes first in the
/// command list.
pub fn recombine(a: &Command, b: &Command) -> PlanResult<Recombined> {
    use Command as C;
    use Recombined::{Merged, Unchanged};

    Ok(match (a, b) {
        (C::Instantiate(x), C::Instantiate(y)) => instantiate_pair(x, y)?,
        (C::Instantiate(i), C::Merge(m)) | (C::Merge(m), C::Instantiate(i)) => {
            Merged(prefer_merge(i, m)?)
        }
        (C::Merge(x), C::Merge(y)) => {
            if x.origin != y.origin {
                return Err(ConflictError::DistinctOrigins {
                    first: x.origin.ident(),
                    second: y.origin.ident(),
                }
                .into());
            }
            Merged(vec![C::Merge(Merge {
                origin: x.origin.clone(),
                ids: union(&x.ids, &y.ids),
            })])
        }
        (C::Terminate(t), C::Instantiate(_) | C::Merge(_) | C::MustLive(_))
        | (C::Instantiate(_) | C::Merge(_) | C::MustLive(_), C::Terminate(t)) => {
            return Err(ConflictError::InstantiateTerminate {
                ident: t.target.clone(),
            }
            .into())
        }
        (C::Terminate(_), C::Terminate(_)) | (C::MustLive(_), C::MustLive(_)) => {
            Merged(vec![a.clone()])
        }
        (C::MustLive(_), C::Instantiate(_) | C::Merge(_))
        | (C::Instantiate(_) | C::Merge(_), C::MustLive(_)) => Unchanged,
        (C::Assign(x), C::Assign(y)) => Merged(vec![C::Assign(assign_pair(x, y)?)]),
        (C::Tag(x), C::Tag(y)) if x == y => Merged(vec![a.clone()]),
        (C::Alias(x), C::Alias(y)) => Merged(vec![C::Alias(Alias {
            ids: union(&x.ids, &y.ids),
        })]),
        (C::BeSource(x), C::BeSource(y)) => claim_pair(x, y, C::BeSource),
        (C::BeTarget(x), C::BeTarget(y)) => claim_pair(x, y, C::BeTarget),
        // Every other pair shares no name key.
        _ => Unchanged,
    })
}

/// Recombine a whole command list until no two commands can merge.
///
/// Returns the surviving commands and the number of merges performed.
pub fn recombine_all(commands: Vec<Command>) -> PlanResult<(Vec<Command>, usize)> {
    let mut queue: VecDeque<Command> = commands.into();
    let mut out: Vec<Command> = Vec::new();
    let mut merges = 0;

    'next: while let Some(command) = queue.pop_front() {
        let keys = command.name_keys();
        if !keys.is_empty() {
            for i in 0..out.len() {
                if !out[i].name_keys().iter().any(|key| keys.contains(key)) {
                    continue;
                }
                if let Recombined::Merged(replacement) = recombine(&out[i], &command)? {
                    trace!(first = %out[i], second = %command, "recombined");
                    out.remove(i);
                    merges += 1;
                    for merged in replacement.into_iter().rev() {
                        queue.push_front(merged);
                    }
                    continue 'next;
                }
            }
        }
        out.push(command);
    }
    Ok((out, merges))
}

fn instantiate_pair(x: &Instantiate, y: &Instantiate) -> PlanResult<Recombined> {
    let Some(ident) = x
        .ids
        .iter()
        .find(|id| y.ids.contains(id))
        .cloned()
        .or_else(|| x.atom.structural_ident())
    else {
        return Ok(Recombined::Unchanged);
    };
    match (&x.atom, &y.atom) {
        (
            Atom::Relation { rt, source, target },
            Atom::Relation {
                rt: other_rt,
                source: other_source,
                target: other_target,
            },
        ) => {
            if rt != other_rt {
                return Err(ConflictError::RelationTypeMismatch {
                    ident,
                    first: rt.clone(),
                    second: other_rt.clone(),
                }
                .into());
            }
            let mut out = vec![Command::Instantiate(Instantiate {
                atom: x.atom.clone(),
                ids: union(&x.ids, &y.ids),
            })];
            out.extend(alias_if_differs(source, other_source));
            out.extend(alias_if_differs(target, other_target));
            Ok(Recombined::Merged(out))
        }
        (first, second) if first == second => {
            Ok(Recombined::Merged(vec![Command::Instantiate(Instantiate {
                atom: x.atom.clone(),
                ids: union(&x.ids, &y.ids),
            })]))
        }
        (first, second) => {
            Err(ConflictError::type_mismatch(ident, first.to_string(), second.to_string()).into())
        }
    }
}

/// A merge carries a concrete origin, so it wins over an instantiate.
fn prefer_merge(i: &Instantiate, m: &Merge) -> PlanResult<Vec<Command>> {
    let compatible = match &i.atom {
        Atom::Delegate(d) => m.origin.kind() == ObjectKind::Delegate(d.clone()),
        Atom::ValueNode(v) => m.origin.kind() == ObjectKind::ValueNode(v.clone()),
        atom => atom.rep_type().is_some() && atom.rep_type() == m.origin.rep_type(),
    };
    if !compatible {
        return Err(ConflictError::type_mismatch(
            m.origin.ident(),
            m.origin.kind().to_string(),
            i.atom.to_string(),
        )
        .into());
    }
    let mut out = vec![Command::Merge(Merge {
        origin: m.origin.clone(),
        ids: union(&m.ids, &i.ids),
    })];
    if let (Atom::Relation { source, target, .. }, Some((s, t))) =
        (&i.atom, m.origin.kind().endpoints())
    {
        out.extend(alias_if_differs(source, &Ident::Origin(s)));
        out.extend(alias_if_differs(target, &Ident::Origin(t)));
    }
    Ok(out)
}

/// An explicit assign overrides an implicit one; otherwise values must agree.
fn assign_pair(x: &Assign, y: &Assign) -> PlanResult<Assign> {
    if x.value == y.value {
        return Ok(Assign {
            explicit: x.explicit || y.explicit,
            ..x.clone()
        });
    }
    match (x.explicit, y.explicit) {
        (true, false) => Ok(x.clone()),
        (false, true) => Ok(y.clone()),
        _ => Err(ConflictError::AssignConflict {
            ident: x.target.clone(),
            first: x.value.clone(),
            second: y.value.clone(),
        }
        .into()),
    }
}

fn claim_pair(x: &Claim, y: &Claim, wrap: fn(Claim) -> Command) -> Recombined {
    let xs: HashSet<&Ident> = x.rel_ids.iter().collect();
    let ys: HashSet<&Ident> = y.rel_ids.iter().collect();
    let exact = x.exact || y.exact;

    if ys.is_subset(&xs) {
        return Recombined::Merged(vec![wrap(Claim { exact, ..x.clone() })]);
    }
    if xs.is_subset(&ys) {
        return Recombined::Merged(vec![wrap(Claim { exact, ..y.clone() })]);
    }
    if !exact {
        return Recombined::Unchanged;
    }

    // An exact claim lists all relations of its type, so unmatched relations
    // on either side must be the same ones. Nothing tells which belongs to
    // which; they are paired in order.
    let only_x: Vec<&Ident> = x.rel_ids.iter().filter(|id| !ys.contains(id)).collect();
    let only_y: Vec<&Ident> = y.rel_ids.iter().filter(|id| !xs.contains(id)).collect();
    warn!(
        target = %x.target,
        rt = %x.rt,
        left = only_x.len(),
        right = only_y.len(),
        "pairing relation claims by position"
    );
    let mut rel_ids = x.rel_ids.clone();
    rel_ids.extend(only_y.iter().skip(only_x.len()).map(|id| (*id).clone()));
    let mut out = vec![wrap(Claim {
        target: x.target.clone(),
        rt: x.rt.clone(),
        rel_ids,
        exact,
    })];
    out.extend(
        only_x
            .iter()
            .zip(only_y.iter())
            .map(|(a, b)| Command::Alias(Alias {
                ids: vec![(*a).clone(), (*b).clone()],
            })),
    );
    Recombined::Merged(out)
}

fn alias_if_differs(a: &Ident, b: &Ident) -> Option<Command> {
    (a != b).then(|| {
        Command::Alias(Alias {
            ids: vec![a.clone(), b.clone()],
        })
    })
}

fn union(a: &[Ident], b: &[Ident]) -> Vec<Ident> {
    let mut out = a.to_vec();
    out.extend(b.iter().cloned());
    dedup(&mut out);
    out
}
