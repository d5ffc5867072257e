//! Culling: dropping commands that would change nothing.
//!
//! A command is culled when the current graph state already satisfies it.
//! Culling an object-producing command records an alias from its
//! identifiers to the object already on the graph, so later commands that
//! refer to those identifiers resolve to it.

use crate::error::{ConflictError, PlanResult};
use crate::{Atom, Bindings, Command, Ident, Origin};
use graft_core::{GraphView, ObjectKind, Uid};
use std::collections::HashSet;
use tracing::trace;

/// The live object an identifier denotes on the graph, if any.
pub(crate) fn live_uid(view: &dyn GraphView, bindings: &Bindings, id: &Ident) -> Option<Uid> {
    match id {
        Ident::Origin(uid) => view.contains(*uid).then_some(*uid),
        Ident::Delegate(delegate) => view.find_delegate(delegate),
        Ident::Value(value) => view.find_value_node(value),
        Ident::User(_) | Ident::Generated(_) => {
            bindings.get(id).filter(|uid| view.contains(*uid))
        }
    }
}

/// Output of one culling pass.
#[derive(Debug, Default)]
pub struct Culled {
    /// Commands that still have an effect.
    pub commands: Vec<Command>,
    /// Identifiers found to denote objects already on the graph.
    pub aliases: Vec<(Ident, Uid)>,
    /// Number of commands dropped.
    pub dropped: usize,
}

/// Culls commands against a snapshot of the graph.
pub struct Culler<'a> {
    view: &'a dyn GraphView,
    bindings: &'a Bindings,
}

impl<'a> Culler<'a> {
    pub fn new(view: &'a dyn GraphView, bindings: &'a Bindings) -> Self {
        Self { view, bindings }
    }

    /// The live object an identifier denotes, if any.
    pub fn lookup(&self, id: &Ident) -> Option<Uid> {
        live_uid(self.view, self.bindings, id)
    }

    /// Drop the commands the snapshot already satisfies.
    ///
    /// Constraint commands are kept while `retain_constraints` is set, so
    /// that recombination can still see them.
    pub fn cull(&self, commands: Vec<Command>, retain_constraints: bool) -> PlanResult<Culled> {
        let produced: HashSet<Ident> = commands.iter().flat_map(Command::produces).collect();
        let mut culled = Culled::default();
        for command in commands {
            for id in command.idents() {
                if let Some(uid) = self.lookup(&id) {
                    if id != Ident::Origin(uid) {
                        culled.aliases.push((id, uid));
                    }
                }
            }
            if self.is_no_op(&command, &produced, retain_constraints, &mut culled.aliases)? {
                trace!(command = %command, "culled");
                culled.dropped += 1;
            } else {
                culled.commands.push(command);
            }
        }
        Ok(culled)
    }

    fn is_no_op(
        &self,
        command: &Command,
        produced: &HashSet<Ident>,
        retain_constraints: bool,
        aliases: &mut Vec<(Ident, Uid)>,
    ) -> PlanResult<bool> {
        Ok(match command {
            Command::Instantiate(c) => match c.atom.structural_ident() {
                Some(own) => match self.lookup(&own) {
                    Some(uid) => {
                        aliases.extend(c.ids.iter().map(|id| (id.clone(), uid)));
                        true
                    }
                    None => false,
                },
                None => {
                    let found = c
                        .ids
                        .iter()
                        .find_map(|id| self.lookup(id).map(|uid| (id, uid)));
                    let Some((id, uid)) = found else {
                        return Ok(false);
                    };
                    let Some(object) = self.view.object(uid) else {
                        return Ok(false);
                    };
                    match (&c.atom, &object.kind) {
                        (
                            Atom::Relation { rt, source, target },
                            ObjectKind::Relation {
                                rt: stored,
                                source: stored_source,
                                target: stored_target,
                            },
                        ) if rt == stored => {
                            aliases.push((source.clone(), *stored_source));
                            aliases.push((target.clone(), *stored_target));
                        }
                        (atom, kind) if atom.rep_type() == kind.rep_type() => {}
                        (atom, kind) => {
                            return Err(ConflictError::type_mismatch(
                                id.clone(),
                                kind.to_string(),
                                atom.to_string(),
                            )
                            .into())
                        }
                    }
                    aliases.extend(c.ids.iter().map(|id| (id.clone(), uid)));
                    true
                }
            },
            Command::Merge(c) => match self.lookup(&c.origin.ident()) {
                Some(uid) => {
                    if let (Origin::Object(wanted), Some(stored)) = (&c.origin, self.view.object(uid)) {
                        if wanted.kind != stored.kind {
                            return Err(ConflictError::type_mismatch(
                                c.origin.ident(),
                                stored.kind.to_string(),
                                wanted.kind.to_string(),
                            )
                            .into());
                        }
                    }
                    aliases.extend(c.ids.iter().map(|id| (id.clone(), uid)));
                    true
                }
                None => false,
            },
            Command::Assign(c) => match self.lookup(&c.target) {
                Some(uid) => match self.view.object(uid).map(|o| o.kind) {
                    Some(ObjectKind::Attribute(vt)) => vt
                        .coerce(&c.value)
                        .is_some_and(|stored| self.view.current_value(uid) == Some(stored)),
                    _ => false,
                },
                None => false,
            },
            // Terminating something already absent is a no-op, unless this
            // batch is about to create it.
            Command::Terminate(c) => {
                self.lookup(&c.target).is_none() && !produced.contains(&c.target)
            }
            Command::Tag(c) => self
                .lookup(&c.target)
                .is_some_and(|uid| self.view.has_tag(uid, &c.tag)),
            Command::SetField(_) => false,
            Command::Alias(c) => c.ids.len() < 2,
            Command::BeSource(_) | Command::BeTarget(_) | Command::MustLive(_) => !retain_constraints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Assign, Instantiate, MustLive, Tag, Terminate};
    use graft_core::{
        ContextId, DelegateRef, EntityType, Finish, GraphStore, GraphUid, RepType, Value, ValueType,
    };
    use graft_graph::Graph;
    use pretty_assertions::assert_eq;

    struct Fixture {
        graph: Graph,
        person: Uid,
        age: Uid,
        delegate: Uid,
    }

    /// A person tagged "me", an Int attribute holding 30, and the Person delegate.
    fn fixture() -> Fixture {
        let mut graph = Graph::with_uid(GraphUid::new(1));
        let handle = graph.open_transaction(ContextId::new(1)).unwrap();
        let person = graph.instantiate(&RepType::entity("Person")).unwrap();
        let age = graph.instantiate(&RepType::Attribute(ValueType::Int)).unwrap();
        graph.assign_value(age, Value::Int(30)).unwrap();
        graph.attach_tag(person, "me").unwrap();
        let delegate = graph
            .delegate(&DelegateRef::new(EntityType::new("Person")))
            .unwrap();
        graph.close_transaction(handle, Finish::Commit).unwrap();
        Fixture {
            graph,
            person,
            age,
            delegate,
        }
    }

    // ========== TEST: satisfied_commands_are_dropped ==========
    #[test]
    fn test_satisfied_commands_are_dropped() {
        // GIVEN commands the graph already satisfies
        let f = fixture();
        let bindings = Bindings::new();
        let commands = vec![
            Command::Assign(Assign {
                target: Ident::Origin(f.age),
                value: Value::Int(30),
                explicit: true,
            }),
            Command::Tag(Tag {
                target: Ident::Origin(f.person),
                tag: "me".into(),
            }),
            Command::Instantiate(Instantiate {
                atom: Atom::Delegate(DelegateRef::new(EntityType::new("Person"))),
                ids: vec![Ident::user("d")],
            }),
        ];

        // WHEN
        let culled = Culler::new(&f.graph, &bindings).cull(commands, true).unwrap();

        // THEN all are dropped, and the delegate name is aliased
        assert!(culled.commands.is_empty());
        assert_eq!(culled.dropped, 3);
        assert!(culled.aliases.contains(&(Ident::user("d"), f.delegate)));
    }

    // ========== TEST: changed_value_survives ==========
    #[test]
    fn test_changed_value_survives() {
        let f = fixture();
        let bindings = Bindings::new();
        let assign = Command::Assign(Assign {
            target: Ident::Origin(f.age),
            value: Value::Int(31),
            explicit: true,
        });

        let culled = Culler::new(&f.graph, &bindings)
            .cull(vec![assign.clone()], true)
            .unwrap();

        assert_eq!(culled.commands, vec![assign]);
    }

    // ========== TEST: bound_instantiate_is_dropped ==========
    #[test]
    fn test_bound_instantiate_is_dropped() {
        // GIVEN p1 bound to the existing person
        let f = fixture();
        let bindings: Bindings = [(Ident::user("p1"), f.person)].into_iter().collect();
        let command = Command::Instantiate(Instantiate {
            atom: Atom::Entity(EntityType::new("Person")),
            ids: vec![Ident::user("p1")],
        });

        // WHEN
        let culled = Culler::new(&f.graph, &bindings).cull(vec![command], true).unwrap();

        // THEN
        assert!(culled.commands.is_empty());
        assert!(culled.aliases.contains(&(Ident::user("p1"), f.person)));
    }

    // ========== TEST: bound_instantiate_of_other_type_conflicts ==========
    #[test]
    fn test_bound_instantiate_of_other_type_conflicts() {
        let f = fixture();
        let bindings: Bindings = [(Ident::user("p1"), f.person)].into_iter().collect();
        let command = Command::Instantiate(Instantiate {
            atom: Atom::Entity(EntityType::new("Dog")),
            ids: vec![Ident::user("p1")],
        });

        let result = Culler::new(&f.graph, &bindings).cull(vec![command], true);

        assert!(matches!(
            result.unwrap_err(),
            crate::PlanError::Conflict(ConflictError::TypeMismatch { .. })
        ));
    }

    // ========== TEST: terminate_of_absent_target ==========
    #[test]
    fn test_terminate_of_absent_target() {
        // GIVEN a terminate of an unknown origin, and one of a name produced in the batch
        let f = fixture();
        let bindings = Bindings::new();
        let absent = Command::Terminate(Terminate {
            target: Ident::Origin(Uid::new(GraphUid::new(1), 999)),
        });
        let pending = Command::Terminate(Terminate {
            target: Ident::user("x"),
        });
        let producer = Command::Instantiate(Instantiate {
            atom: Atom::Entity(EntityType::new("Person")),
            ids: vec![Ident::user("x")],
        });

        // WHEN
        let culled = Culler::new(&f.graph, &bindings)
            .cull(vec![absent, pending.clone(), producer.clone()], true)
            .unwrap();

        // THEN only the absent one is a no-op
        assert_eq!(culled.commands, vec![pending, producer]);
    }

    // ========== TEST: constraints_dropped_in_final_pass ==========
    #[test]
    fn test_constraints_dropped_in_final_pass() {
        let f = fixture();
        let bindings = Bindings::new();
        let must_live = Command::MustLive(MustLive {
            target: Ident::Origin(f.person),
        });
        let culler = Culler::new(&f.graph, &bindings);

        let kept = culler.cull(vec![must_live.clone()], true).unwrap();
        let dropped = culler.cull(vec![must_live], false).unwrap();

        assert_eq!(kept.commands.len(), 1);
        assert!(dropped.commands.is_empty());
    }

    // ========== TEST: culling_is_pure ==========
    #[test]
    fn test_culling_is_pure() {
        let f = fixture();
        let bindings = Bindings::new();
        let commands = vec![Command::Assign(Assign {
            target: Ident::Origin(f.age),
            value: Value::Int(30),
            explicit: true,
        })];
        let culler = Culler::new(&f.graph, &bindings);

        let first = culler.cull(commands.clone(), true).unwrap();
        let second = culler.cull(commands, true).unwrap();

        assert_eq!(first.commands, second.commands);
        assert_eq!(first.aliases, second.aliases);
    }
}
