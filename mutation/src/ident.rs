//! Identifiers linking commands before they resolve to graph objects.

use graft_core::{DelegateRef, Uid, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix that generated identifiers are rendered with.
pub const GENERATED_PREFIX: &str = "tmp_id_";

/// Receipt key reserved for the transaction marker.
pub const RECEIPT_TX_KEY: &str = "tx";

/// A symbolic or structural name for an object.
///
/// Identifiers are compared by value. The variant order is also the order in
/// which aliases prefer a representative: a concrete origin beats a
/// structural reference, which beats a user name, which beats a generated
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ident {
    /// A concrete object already on some graph.
    Origin(Uid),
    /// The delegate node of a representation type.
    Delegate(DelegateRef),
    /// The value node holding a value.
    Value(Value),
    /// A name chosen by the user.
    User(String),
    /// A name minted by the planner.
    Generated(u64),
}

impl Ident {
    pub fn user(name: impl Into<String>) -> Self {
        Ident::User(name.into())
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Ident::User(_))
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Ident::Generated(_))
    }

    /// Origins, delegates and values name one object by construction.
    pub fn is_structural(&self) -> bool {
        matches!(self, Ident::Origin(_) | Ident::Delegate(_) | Ident::Value(_))
    }

    pub fn as_origin(&self) -> Option<Uid> {
        match self {
            Ident::Origin(uid) => Some(*uid),
            _ => None,
        }
    }

    /// Rank used when choosing the representative of an alias set.
    pub(crate) fn preference(&self) -> u8 {
        match self {
            Ident::Origin(_) => 0,
            Ident::Delegate(_) | Ident::Value(_) => 1,
            Ident::User(_) => 2,
            Ident::Generated(_) => 3,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ident::Origin(uid) => write!(f, "uid:{}", uid),
            Ident::Delegate(d) => write!(f, "{}", d),
            Ident::Value(v) => write!(f, "value:{}", v),
            Ident::User(name) => write!(f, "{}", name),
            Ident::Generated(n) => write!(f, "{}{}", GENERATED_PREFIX, n),
        }
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::user(name)
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Ident::User(name)
    }
}

impl From<Uid> for Ident {
    fn from(uid: Uid) -> Self {
        Ident::Origin(uid)
    }
}

/// Mints fresh generated identifiers, deterministically.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator whose identifiers never collide with the given ones.
    pub fn after<'a>(seen: impl IntoIterator<Item = &'a Ident>) -> Self {
        let next = seen
            .into_iter()
            .filter_map(|id| match id {
                Ident::Generated(n) => Some(n + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        Self { next }
    }

    pub fn mint(&mut self) -> Ident {
        let id = Ident::Generated(self.next);
        self.next += 1;
        id
    }

    /// Number of identifiers that can have been minted so far.
    pub fn minted(&self) -> u64 {
        self.next
    }
}

/// Identifiers already known to name objects on the graph, e.g. the
/// entries of a previous receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    bound: BTreeMap<Ident, Uid>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, id: impl Into<Ident>, uid: Uid) -> &mut Self {
        self.bound.insert(id.into(), uid);
        self
    }

    pub fn get(&self, id: &Ident) -> Option<Uid> {
        self.bound.get(id).copied()
    }

    pub fn contains(&self, id: &Ident) -> bool {
        self.bound.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ident, Uid)> {
        self.bound.iter().map(|(id, uid)| (id, *uid))
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

impl FromIterator<(Ident, Uid)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (Ident, Uid)>>(iter: I) -> Self {
        Self {
            bound: iter.into_iter().collect(),
        }
    }
}
