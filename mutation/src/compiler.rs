//! Expression compiler: flattens wishes into primitive commands.
//!
//! Works through an explicit queue of pending wishes. Each step takes the
//! front wish, emits the commands it can emit directly and queues follow-up
//! wishes for its nested parts. A nested part is first given an identifier
//! (the user's, or a freshly generated one) and only then queued, so the
//! wish that contains it can refer to it by name.

use crate::cull::live_uid;
use crate::error::{PlanResult, ValidationError};
use crate::fields;
use crate::resolver::Definitions;
use crate::{
    Assign, Atom, Bindings, Claim, Command, Endpoint, FieldValue, IdGenerator, Ident, Instantiate,
    Merge, MustLive, Origin, PlanConfig, SetField, Tag, Terminate, Wish,
};
use graft_core::{GraphView, ObjectKind, ObjectRef, RelationType, RepType, Value, ValueType};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::{debug, trace};

/// Where a nested wish appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Subject,
    Endpoint,
    Field,
    Target,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Position::Subject => "a subject",
            Position::Endpoint => "a relation endpoint",
            Position::Field => "a field value",
            Position::Target => "a command target",
        };
        f.write_str(name)
    }
}

pub(crate) struct Compiler<'a> {
    config: &'a PlanConfig,
    view: &'a dyn GraphView,
    bindings: &'a Bindings,
    definitions: &'a Definitions,
    ids: IdGenerator,
    /// Types of identifiers introduced by emitted commands.
    types: BTreeMap<Ident, RepType>,
    commands: Vec<Command>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        config: &'a PlanConfig,
        view: &'a dyn GraphView,
        bindings: &'a Bindings,
        definitions: &'a Definitions,
    ) -> Self {
        Self {
            config,
            view,
            bindings,
            definitions,
            ids: IdGenerator::after(definitions.idents()),
            types: BTreeMap::new(),
            commands: Vec::new(),
        }
    }

    /// Compile wishes until no wish is pending.
    pub(crate) fn compile(mut self, wishes: &[Wish]) -> PlanResult<Vec<Command>> {
        let mut queue: VecDeque<Wish> = wishes.iter().cloned().collect();
        let mut steps = 0usize;
        while let Some(wish) = queue.pop_front() {
            steps += 1;
            let follow_ups = self.step(wish)?;
            for wish in follow_ups.into_iter().rev() {
                queue.push_front(wish);
            }
        }
        debug!(
            steps,
            commands = self.commands.len(),
            generated = self.ids.minted(),
            "compiled wishes"
        );
        Ok(self.commands)
    }

    fn step(&mut self, wish: Wish) -> PlanResult<Vec<Wish>> {
        let mut next = Vec::new();
        match wish {
            Wish::Instance { ty, name } => {
                let atom = match ty {
                    RepType::Entity(t) => Atom::Entity(t),
                    RepType::Attribute(t) => Atom::Attribute(t),
                    RepType::Relation(rt) => {
                        return Err(ValidationError::BareRelationType { rt }.into())
                    }
                };
                let id = name.unwrap_or_else(|| self.ids.mint());
                self.emit(Command::Instantiate(Instantiate {
                    atom,
                    ids: vec![id],
                }));
            }
            Wish::Scalar { value, .. } => {
                return Err(ValidationError::AmbiguousScalar { value }.into());
            }
            Wish::Ref(_) => {}
            Wish::Existing {
                object,
                value,
                name,
            } => self.existing(object, value, name)?,
            Wish::Delegate { of, name } => self.emit(Command::Instantiate(Instantiate {
                atom: Atom::Delegate(of),
                ids: name.into_iter().collect(),
            })),
            Wish::ValueNode(value) => self.emit(Command::Instantiate(Instantiate {
                atom: Atom::ValueNode(value),
                ids: Vec::new(),
            })),
            Wish::Triple {
                source,
                rt,
                name,
                target,
            } => self.triple(source, rt, name, target, &mut next)?,
            Wish::Fields { subject, fields } => {
                let subject = self.realize(*subject, Position::Subject, &mut next)?;
                for (rt, value) in fields {
                    let values = match value {
                        Wish::Group(items) => items,
                        other => vec![other],
                    };
                    for value in values {
                        if let Wish::Group(_) = value {
                            return Err(ValidationError::nested_list(Position::Field.to_string()).into());
                        }
                        let value = self.realize(value, Position::Field, &mut next)?;
                        next.push(Wish::triple(
                            Wish::Ref(subject.clone()),
                            rt.clone(),
                            Wish::Ref(value),
                        ));
                    }
                }
            }
            Wish::SetField {
                subject,
                rt,
                value,
                direction,
            } => {
                let subject = self.realize(*subject, Position::Subject, &mut next)?;
                let value = match *value {
                    Wish::Scalar { value, .. } => FieldValue::Value(value),
                    other => FieldValue::Target(self.realize(other, Position::Endpoint, &mut next)?),
                };
                self.set_field(SetField {
                    subject,
                    rt,
                    value,
                    direction,
                });
            }
            Wish::Assign { target, value } => {
                let target = self.realize(*target, Position::Target, &mut next)?;
                self.check_assign(&target, &value)?;
                self.emit(Command::Assign(Assign {
                    target: target.clone(),
                    value,
                    explicit: true,
                }));
                self.emit(Command::MustLive(MustLive { target }));
            }
            Wish::Tag { target, tag } => {
                let target = self.realize(*target, Position::Target, &mut next)?;
                self.emit(Command::Tag(Tag {
                    target: target.clone(),
                    tag,
                }));
                self.emit(Command::MustLive(MustLive { target }));
            }
            Wish::Terminate { target } => {
                let target = self.realize(*target, Position::Target, &mut next)?;
                self.emit(Command::Terminate(Terminate { target }));
            }
            Wish::Group(wishes) => next.extend(wishes),
            Wish::Command(command) => self.command(command)?,
        }
        Ok(next)
    }

    /// Obtain the identifier of a nested wish, queueing the wish itself.
    fn realize(&mut self, wish: Wish, position: Position, next: &mut Vec<Wish>) -> PlanResult<Ident> {
        match wish {
            Wish::Ref(id) => Ok(id),
            Wish::Scalar { value, name } => {
                let allowed = match position {
                    Position::Field => true,
                    Position::Endpoint => self.config.allow_scalar_endpoints,
                    Position::Subject | Position::Target => false,
                };
                if !allowed {
                    return Err(ValidationError::AmbiguousScalar { value }.into());
                }
                let id = name.unwrap_or_else(|| self.ids.mint());
                self.emit(Command::Instantiate(Instantiate {
                    atom: Atom::Attribute(ValueType::of(&value)),
                    ids: vec![id.clone()],
                }));
                self.emit(Command::Assign(Assign {
                    target: id.clone(),
                    value,
                    explicit: true,
                }));
                Ok(id)
            }
            Wish::Instance { ty, name } => {
                if let RepType::Relation(rt) = ty {
                    return Err(ValidationError::BareRelationType { rt }.into());
                }
                let id = name.unwrap_or_else(|| self.ids.mint());
                self.types.insert(id.clone(), ty.clone());
                next.push(Wish::Instance {
                    ty,
                    name: Some(id.clone()),
                });
                Ok(id)
            }
            Wish::Existing { ref object, .. } => {
                let id = Ident::Origin(object.uid);
                if let Some(ty) = object.kind.rep_type() {
                    self.types.insert(id.clone(), ty);
                }
                next.push(wish);
                Ok(id)
            }
            Wish::Delegate { ref of, .. } => {
                let id = Ident::Delegate(of.clone());
                next.push(wish);
                Ok(id)
            }
            Wish::ValueNode(ref value) => {
                let id = Ident::Value(value.clone());
                next.push(wish);
                Ok(id)
            }
            Wish::Triple {
                source,
                rt,
                name,
                target,
            } => {
                if matches!(source, Endpoint::Many(_)) || matches!(target, Endpoint::Many(_)) {
                    return Err(ValidationError::malformed(format!(
                        "a list-valued {} triple cannot be used as {}",
                        rt, position
                    ))
                    .into());
                }
                let id = name.unwrap_or_else(|| self.ids.mint());
                self.types.insert(id.clone(), RepType::Relation(rt.clone()));
                next.push(Wish::Triple {
                    source,
                    rt,
                    name: Some(id.clone()),
                    target,
                });
                Ok(id)
            }
            Wish::Fields { subject, fields } => {
                let id = self.realize(*subject, position, next)?;
                next.push(Wish::Fields {
                    subject: Box::new(Wish::Ref(id.clone())),
                    fields,
                });
                Ok(id)
            }
            Wish::Group(_) => Err(ValidationError::nested_list(position.to_string()).into()),
            Wish::SetField { .. }
            | Wish::Assign { .. }
            | Wish::Tag { .. }
            | Wish::Terminate { .. }
            | Wish::Command(_) => {
                Err(ValidationError::invalid_position(wish.describe(), position.to_string()).into())
            }
        }
    }

    fn triple(
        &mut self,
        source: Endpoint,
        rt: RelationType,
        name: Option<Ident>,
        target: Endpoint,
        next: &mut Vec<Wish>,
    ) -> PlanResult<()> {
        match (source, target) {
            (Endpoint::One(source), Endpoint::One(target)) => match (*source, *target, name) {
                (Wish::Ref(source), Wish::Ref(target), Some(id)) => {
                    self.relation(rt, id, source, target);
                }
                (source, target, name) => {
                    let source = self.realize(source, Position::Endpoint, next)?;
                    let target = self.realize(target, Position::Endpoint, next)?;
                    let id = name.unwrap_or_else(|| self.ids.mint());
                    next.push(Wish::Triple {
                        source: Wish::Ref(source).into(),
                        rt,
                        name: Some(id),
                        target: Wish::Ref(target).into(),
                    });
                }
            },
            (source, target) => {
                if name.is_some() {
                    return Err(ValidationError::malformed(format!(
                        "named {} relation cannot fan out over a list",
                        rt
                    ))
                    .into());
                }
                let sources = self.realize_all(source, next)?;
                let targets = self.realize_all(target, next)?;
                for source in &sources {
                    for target in &targets {
                        next.push(Wish::triple(
                            Wish::Ref(source.clone()),
                            rt.clone(),
                            Wish::Ref(target.clone()),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    fn realize_all(&mut self, endpoint: Endpoint, next: &mut Vec<Wish>) -> PlanResult<Vec<Ident>> {
        match endpoint {
            Endpoint::One(wish) => Ok(vec![self.realize(*wish, Position::Endpoint, next)?]),
            Endpoint::Many(wishes) => wishes
                .into_iter()
                .map(|wish| match wish {
                    Wish::Group(_) => Err(ValidationError::nested_list("a relation endpoint list").into()),
                    wish => self.realize(wish, Position::Endpoint, next),
                })
                .collect(),
        }
    }

    fn relation(&mut self, rt: RelationType, id: Ident, source: Ident, target: Ident) {
        self.emit(Command::Instantiate(Instantiate {
            atom: Atom::Relation {
                rt: rt.clone(),
                source: source.clone(),
                target: target.clone(),
            },
            ids: vec![id.clone()],
        }));
        self.emit(Command::BeSource(Claim {
            target: source,
            rt: rt.clone(),
            rel_ids: vec![id.clone()],
            exact: false,
        }));
        self.emit(Command::BeTarget(Claim {
            target,
            rt,
            rel_ids: vec![id],
            exact: false,
        }));
    }

    fn existing(&mut self, object: ObjectRef, value: Option<Value>, name: Option<Ident>) -> PlanResult<()> {
        let origin = Ident::Origin(object.uid);
        if let Some(value) = value {
            match &object.kind {
                ObjectKind::Attribute(vt) if vt.accepts(&value) => {}
                kind => {
                    return Err(ValidationError::ValueTypeMismatch {
                        ident: origin,
                        expected: kind.to_string(),
                        value,
                    }
                    .into())
                }
            }
            self.emit(Command::Assign(Assign {
                target: origin,
                value,
                explicit: false,
            }));
        }
        self.emit(Command::Merge(Merge {
            origin: Origin::Object(object),
            ids: name.into_iter().collect(),
        }));
        Ok(())
    }

    fn command(&mut self, command: Command) -> PlanResult<()> {
        match command {
            Command::Alias(_) => {
                return Err(ValidationError::InternalCommand {
                    kind: command.kind(),
                }
                .into())
            }
            Command::SetField(field) => self.set_field(field),
            Command::Assign(ref assign) => {
                self.check_assign(&assign.target, &assign.value)?;
                self.emit(command);
            }
            Command::Instantiate(_)
            | Command::Merge(_)
            | Command::Terminate(_)
            | Command::Tag(_)
            | Command::BeSource(_)
            | Command::BeTarget(_)
            | Command::MustLive(_) => self.emit(command),
        }
        Ok(())
    }

    fn set_field(&mut self, field: SetField) {
        let (view, bindings) = (self.view, self.bindings);
        let expanded = fields::expand(field, view, |id| live_uid(view, bindings, id), &mut self.ids);
        for command in expanded {
            self.emit(command);
        }
    }

    fn check_assign(&self, target: &Ident, value: &Value) -> PlanResult<()> {
        match self.known_type(target) {
            None => Ok(()),
            Some(RepType::Attribute(vt)) if vt.accepts(value) => Ok(()),
            Some(ty) => Err(ValidationError::ValueTypeMismatch {
                ident: target.clone(),
                expected: ty.to_string(),
                value: value.clone(),
            }
            .into()),
        }
    }

    fn known_type(&self, id: &Ident) -> Option<RepType> {
        if let Some(ty) = self.types.get(id).or_else(|| self.definitions.rep_type(id)) {
            return Some(ty.clone());
        }
        live_uid(self.view, self.bindings, id)
            .and_then(|uid| self.view.object(uid))
            .and_then(|object| object.kind.rep_type())
    }

    fn emit(&mut self, command: Command) {
        let produced_type = match &command {
            Command::Instantiate(c) => c.atom.rep_type(),
            Command::Merge(c) => c.origin.rep_type(),
            _ => None,
        };
        if let Some(ty) = produced_type {
            for id in command.produces() {
                self.types.insert(id, ty.clone());
            }
        }
        trace!(command = %command, "emitted");
        self.commands.push(command);
    }
}
