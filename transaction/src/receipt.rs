//! Receipts: what a transaction's identifiers resolved to.

use graft_core::ObjectRef;
use graft_mutation::{Bindings, Ident, Shape, GENERATED_PREFIX, RECEIPT_TX_KEY};
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// How a transaction ended.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxMarker {
    /// Changes were committed; the marker object identifies the new slice.
    Committed(ObjectRef),
    /// The execution ran inside an enclosing scope, which decides.
    Nested,
    /// Nothing changed, so no transaction was recorded.
    NoTransaction,
}

/// Identifier to object mapping returned by a transaction.
///
/// Objects terminated by the transaction do not appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    objects: BTreeMap<Ident, ObjectRef>,
    tx: TxMarker,
}

impl Receipt {
    pub fn new(objects: BTreeMap<Ident, ObjectRef>, tx: TxMarker) -> Self {
        Self { objects, tx }
    }

    pub fn get(&self, id: &Ident) -> Option<&ObjectRef> {
        self.objects.get(id)
    }

    /// Object for a user-chosen name.
    pub fn user(&self, name: &str) -> Option<&ObjectRef> {
        self.objects.get(&Ident::user(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ident, &ObjectRef)> {
        self.objects.iter()
    }

    pub fn tx(&self) -> &TxMarker {
        &self.tx
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop the identifiers the planner minted.
    pub fn without_generated(mut self) -> Self {
        self.objects.retain(|id, _| !id.is_generated());
        self
    }

    /// Bindings that make a later plan refer to the same objects.
    ///
    /// Generated identifiers are minted deterministically from the wish
    /// list, so a receipt that kept them only binds correctly when the same
    /// wishes are submitted again.
    pub fn to_bindings(&self) -> Bindings {
        self.objects
            .iter()
            .map(|(id, object)| (id.clone(), object.uid))
            .collect()
    }

    /// Rebuild a template's nesting with the objects of this receipt.
    pub fn unpack(&self, shape: &Shape) -> Unpacked {
        match shape {
            Shape::Leaf(id) => match self.objects.get(id) {
                Some(object) => Unpacked::Object(object.clone()),
                None => Unpacked::Absent,
            },
            Shape::Seq(items) => Unpacked::Seq(items.iter().map(|item| self.unpack(item)).collect()),
            Shape::Opaque => Unpacked::Absent,
        }
    }
}

// The serialized form is a flat map from names to objects plus the tx key.
// Structural identifiers (values, delegates) are left out: they name their
// object by construction, and their display form is not parseable.
impl Serialize for Receipt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let named: Vec<_> = self.objects.iter().filter(|(id, _)| !id.is_structural()).collect();
        let mut map = serializer.serialize_map(Some(named.len() + 1))?;
        for (id, object) in named {
            map.serialize_entry(&id.to_string(), object)?;
        }
        map.serialize_entry(RECEIPT_TX_KEY, &self.tx)?;
        map.end()
    }
}

/// Inverse of the `Display` form of user and generated identifiers.
fn parse_name(key: String) -> Ident {
    match key.strip_prefix(GENERATED_PREFIX).and_then(|n| n.parse().ok()) {
        Some(n) => Ident::Generated(n),
        None => Ident::User(key),
    }
}

impl<'de> Deserialize<'de> for Receipt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReceiptVisitor;

        impl<'de> Visitor<'de> for ReceiptVisitor {
            type Value = Receipt;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a map of names to objects with a {:?} entry", RECEIPT_TX_KEY)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Receipt, A::Error> {
                let mut objects = BTreeMap::new();
                let mut tx = None;
                while let Some(key) = access.next_key::<String>()? {
                    if key == RECEIPT_TX_KEY {
                        if tx.is_some() {
                            return Err(de::Error::duplicate_field(RECEIPT_TX_KEY));
                        }
                        tx = Some(access.next_value()?);
                        continue;
                    }
                    let object: ObjectRef = access.next_value()?;
                    if objects.insert(parse_name(key.clone()), object).is_some() {
                        return Err(de::Error::custom(format!("duplicate name {:?}", key)));
                    }
                }
                let tx = tx.ok_or_else(|| de::Error::missing_field(RECEIPT_TX_KEY))?;
                Ok(Receipt { objects, tx })
            }
        }

        deserializer.deserialize_map(ReceiptVisitor)
    }
}

/// A template position filled in from a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unpacked {
    Object(ObjectRef),
    /// Nothing to report: the object was terminated, or the position names
    /// no single object.
    Absent,
    Seq(Vec<Unpacked>),
}

impl Unpacked {
    /// Every object, depth first.
    pub fn leaves(&self) -> Vec<&ObjectRef> {
        match self {
            Unpacked::Object(object) => vec![object],
            Unpacked::Absent => Vec::new(),
            Unpacked::Seq(items) => items.iter().flat_map(Unpacked::leaves).collect(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Unpacked::Object(object) => Some(object),
            Unpacked::Absent | Unpacked::Seq(_) => None,
        }
    }
}
