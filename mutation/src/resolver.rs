//! Identifier resolution.
//!
//! Collects every identifier a wish list declares, together with the kind of
//! object it is declared against, and checks that every symbolic reference
//! is backed by a declaration or a binding.

use crate::error::{PlanResult, ValidationError};
use crate::{Atom, Bindings, Command, Ident, Origin, Wish, GENERATED_PREFIX, RECEIPT_TX_KEY};
use graft_core::{DelegateRef, ObjectKind, RepType, Value, ValueType};
use std::collections::BTreeMap;
use std::fmt;

/// What an identifier was declared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Instance(RepType),
    Delegate(DelegateRef),
    ValueNode(Value),
}

impl Declaration {
    fn of_kind(kind: &ObjectKind) -> PlanResult<Declaration> {
        Ok(match kind {
            ObjectKind::Entity(t) => Declaration::Instance(RepType::Entity(t.clone())),
            ObjectKind::Attribute(t) => Declaration::Instance(RepType::Attribute(t.clone())),
            ObjectKind::Relation { rt, .. } => Declaration::Instance(RepType::Relation(rt.clone())),
            ObjectKind::Delegate(d) => Declaration::Delegate(d.clone()),
            ObjectKind::ValueNode(v) => Declaration::ValueNode(v.clone()),
            ObjectKind::TxMarker => {
                return Err(ValidationError::invalid_position("transaction marker", "a wish").into())
            }
        })
    }

    fn of_atom(atom: &Atom) -> Declaration {
        match atom {
            Atom::Entity(t) => Declaration::Instance(RepType::Entity(t.clone())),
            Atom::Attribute(t) => Declaration::Instance(RepType::Attribute(t.clone())),
            Atom::Relation { rt, .. } => Declaration::Instance(RepType::Relation(rt.clone())),
            Atom::Delegate(d) => Declaration::Delegate(d.clone()),
            Atom::ValueNode(v) => Declaration::ValueNode(v.clone()),
        }
    }

    fn of_origin(origin: &Origin) -> PlanResult<Declaration> {
        match origin {
            Origin::Object(object) => Declaration::of_kind(&object.kind),
            Origin::Delegate(d) => Ok(Declaration::Delegate(d.clone())),
            Origin::Value(v) => Ok(Declaration::ValueNode(v.clone())),
        }
    }

    pub fn rep_type(&self) -> Option<&RepType> {
        match self {
            Declaration::Instance(ty) => Some(ty),
            Declaration::Delegate(_) | Declaration::ValueNode(_) => None,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Instance(ty) => write!(f, "{}", ty),
            Declaration::Delegate(d) => write!(f, "{}", d),
            Declaration::ValueNode(v) => write!(f, "value({})", v),
        }
    }
}

/// Identifiers declared by a wish list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definitions {
    declared: BTreeMap<Ident, Declaration>,
}

impl Definitions {
    pub fn get(&self, id: &Ident) -> Option<&Declaration> {
        self.declared.get(id)
    }

    pub fn contains(&self, id: &Ident) -> bool {
        self.declared.contains_key(id)
    }

    /// The representation type an identifier was declared with.
    pub fn rep_type(&self, id: &Ident) -> Option<&RepType> {
        self.get(id).and_then(Declaration::rep_type)
    }

    pub fn idents(&self) -> impl Iterator<Item = &Ident> {
        self.declared.keys()
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}

/// Resolve the identifiers of a wish list.
///
/// Pure: the same input always yields the same definitions.
pub fn resolve(wishes: &[Wish], bindings: &Bindings) -> PlanResult<Definitions> {
    let mut resolver = Resolver::default();
    for wish in wishes {
        resolver.visit(wish)?;
    }
    resolver.finish(bindings)
}

#[derive(Default)]
struct Resolver {
    definitions: Definitions,
    referenced: Vec<Ident>,
    assigns: Vec<(Ident, Value)>,
}

impl Resolver {
    fn visit(&mut self, wish: &Wish) -> PlanResult<()> {
        match wish {
            Wish::Instance { ty, name } => {
                if let RepType::Relation(rt) = ty {
                    return Err(ValidationError::BareRelationType { rt: rt.clone() }.into());
                }
                if let Some(name) = name {
                    self.declare(name, Declaration::Instance(ty.clone()))?;
                }
            }
            Wish::Scalar { value, name } => {
                if let Some(name) = name {
                    let ty = RepType::Attribute(ValueType::of(value));
                    self.declare(name, Declaration::Instance(ty))?;
                }
            }
            Wish::Ref(id) => self.reference(id)?,
            Wish::Existing {
                object,
                value,
                name,
            } => {
                let declaration = Declaration::of_kind(&object.kind)?;
                self.declare(&Ident::Origin(object.uid), declaration.clone())?;
                if let Some(name) = name {
                    self.declare(name, declaration)?;
                }
                if let Some(value) = value {
                    self.assigns.push((Ident::Origin(object.uid), value.clone()));
                }
            }
            Wish::Delegate { of, name } => {
                if let Some(name) = name {
                    self.declare(name, Declaration::Delegate(of.clone()))?;
                }
            }
            Wish::ValueNode(_) => {}
            Wish::Triple {
                source,
                rt,
                name,
                target,
            } => {
                for wish in source.iter().chain(target.iter()) {
                    self.visit(wish)?;
                }
                if let Some(name) = name {
                    self.declare(name, Declaration::Instance(RepType::Relation(rt.clone())))?;
                }
            }
            Wish::Fields { subject, fields } => {
                self.visit(subject)?;
                for (_, value) in fields {
                    self.visit(value)?;
                }
            }
            Wish::SetField { subject, value, .. } => {
                self.visit(subject)?;
                self.visit(value)?;
            }
            Wish::Assign { target, value } => {
                self.visit(target)?;
                if let Some(id) = single_ident(target) {
                    self.assigns.push((id, value.clone()));
                }
            }
            Wish::Tag { target, .. } | Wish::Terminate { target } => self.visit(target)?,
            Wish::Group(wishes) => {
                for wish in wishes {
                    self.visit(wish)?;
                }
            }
            Wish::Command(command) => self.visit_command(command)?,
        }
        Ok(())
    }

    fn visit_command(&mut self, command: &Command) -> PlanResult<()> {
        match command {
            Command::Alias(_) => {
                return Err(ValidationError::InternalCommand {
                    kind: command.kind(),
                }
                .into())
            }
            Command::Instantiate(c) => {
                let declaration = Declaration::of_atom(&c.atom);
                for id in &c.ids {
                    self.declare(id, declaration.clone())?;
                }
            }
            Command::Merge(c) => {
                let declaration = Declaration::of_origin(&c.origin)?;
                self.declare(&c.origin.ident(), declaration.clone())?;
                for id in &c.ids {
                    self.declare(id, declaration.clone())?;
                }
            }
            Command::Assign(c) => self.assigns.push((c.target.clone(), c.value.clone())),
            Command::Terminate(_)
            | Command::Tag(_)
            | Command::SetField(_)
            | Command::BeSource(_)
            | Command::BeTarget(_)
            | Command::MustLive(_) => {}
        }
        for id in command.consumes() {
            self.reference(&id)?;
        }
        Ok(())
    }

    fn declare(&mut self, id: &Ident, declaration: Declaration) -> PlanResult<()> {
        check_reserved(id)?;
        match self.definitions.declared.get(id) {
            Some(previous) if *previous != declaration => {
                Err(ValidationError::ConflictingDeclaration {
                    ident: id.clone(),
                    first: previous.to_string(),
                    second: declaration.to_string(),
                }
                .into())
            }
            Some(_) => Ok(()),
            None => {
                self.definitions.declared.insert(id.clone(), declaration);
                Ok(())
            }
        }
    }

    fn reference(&mut self, id: &Ident) -> PlanResult<()> {
        check_reserved(id)?;
        self.referenced.push(id.clone());
        Ok(())
    }

    fn finish(self, bindings: &Bindings) -> PlanResult<Definitions> {
        let missing = self.referenced.iter().find(|id| {
            !id.is_structural() && !self.definitions.contains(id) && !bindings.contains(id)
        });
        if let Some(id) = missing {
            return Err(ValidationError::MissingDefinition { ident: id.clone() }.into());
        }

        for (id, value) in &self.assigns {
            match self.definitions.get(id) {
                Some(Declaration::Instance(RepType::Attribute(vt))) if vt.accepts(value) => {}
                Some(declaration) => {
                    return Err(ValidationError::ValueTypeMismatch {
                        ident: id.clone(),
                        expected: declaration.to_string(),
                        value: value.clone(),
                    }
                    .into())
                }
                // Bound or origin targets are checked against the graph.
                None => {}
            }
        }
        Ok(self.definitions)
    }
}

/// User names may not shadow the receipt's tx key or a generated name.
fn check_reserved(id: &Ident) -> PlanResult<()> {
    match id {
        Ident::User(name) if name == RECEIPT_TX_KEY || name.starts_with(GENERATED_PREFIX) => Err(ValidationError::ReservedIdent {
            name: name.clone(),
        }
        .into()),
        _ => Ok(()),
    }
}

/// The identifier a single-object wish is known by, if it names one.
pub(crate) fn single_ident(wish: &Wish) -> Option<Ident> {
    match wish {
        Wish::Ref(id) => Some(id.clone()),
        Wish::Instance { name, .. } | Wish::Scalar { name, .. } | Wish::Triple { name, .. } => {
            name.clone()
        }
        Wish::Existing { object, .. } => Some(Ident::Origin(object.uid)),
        Wish::Delegate { of, .. } => Some(Ident::Delegate(of.clone())),
        Wish::ValueNode(v) => Some(Ident::Value(v.clone())),
        Wish::Fields { .. }
        | Wish::SetField { .. }
        | Wish::Assign { .. }
        | Wish::Tag { .. }
        | Wish::Terminate { .. }
        | Wish::Group(_)
        | Wish::Command(_) => None,
    }
}
