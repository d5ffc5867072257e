//! Alias resolution.
//!
//! Identifiers found to denote the same object are merged into one set. Each
//! set is represented by its most preferred member, so a set that contains a
//! concrete origin is always represented by that origin.

use crate::error::{ConflictError, PlanResult};
use crate::{Command, Ident};
use graft_core::Uid;
use std::collections::BTreeMap;

/// Union-find over identifiers.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    parent: BTreeMap<Ident, Ident>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The representative of the set `id` belongs to.
    pub fn canonical(&self, id: &Ident) -> Ident {
        let mut current = id;
        while let Some(parent) = self.parent.get(current) {
            current = parent;
        }
        current.clone()
    }

    /// Record that `id` denotes the object `uid`.
    pub fn bind(&mut self, id: &Ident, uid: Uid) -> PlanResult<bool> {
        self.union(id, &Ident::Origin(uid))
    }

    /// Merge the sets of two identifiers. Returns true if anything changed.
    pub fn union(&mut self, a: &Ident, b: &Ident) -> PlanResult<bool> {
        let (ra, rb) = (self.canonical(a), self.canonical(b));
        if ra == rb {
            return Ok(false);
        }
        if distinct(&ra, &rb) {
            return Err(ConflictError::DistinctOrigins {
                first: ra,
                second: rb,
            }
            .into());
        }
        let (root, child) = if (ra.preference(), &ra) <= (rb.preference(), &rb) {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent.insert(child, root);
        Ok(true)
    }

    /// Merge all identifiers into one set.
    pub fn union_all(&mut self, ids: &[Ident]) -> PlanResult<bool> {
        let mut changed = false;
        if let Some((first, rest)) = ids.split_first() {
            for id in rest {
                changed |= self.union(first, id)?;
            }
        }
        Ok(changed)
    }

    /// Rewrite a command to use representatives only.
    pub fn relabel(&self, command: Command) -> Command {
        if self.parent.is_empty() {
            return command;
        }
        command.map_idents(&|id| self.canonical(id))
    }

    /// Every aliased identifier with its representative.
    pub fn resolved(&self) -> BTreeMap<Ident, Ident> {
        self.parent
            .keys()
            .map(|id| (id.clone(), self.canonical(id)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Two representatives that can never be the same object. Delegates and
/// value nodes may be identified with the origin of the node realizing them,
/// but two origins, or two structural references, name distinct objects.
fn distinct(a: &Ident, b: &Ident) -> bool {
    match (a, b) {
        (Ident::Origin(_), Ident::Origin(_)) => true,
        (Ident::Delegate(_) | Ident::Value(_), Ident::Delegate(_) | Ident::Value(_)) => true,
        _ => false,
    }
}
