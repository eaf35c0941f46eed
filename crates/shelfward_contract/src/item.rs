//! Catalog items and external identifiers.

use crate::field::IdentifierKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Attribute map of a catalog item, keyed by contract field key.
///
/// Keys should be a subset of the owning contract's field keys, but
/// this is not enforced: unknown keys are preserved and rendered
/// generically. BTreeMap keeps iteration deterministic.
pub type Attributes = BTreeMap<String, Value>;

/// Unique identifier for a catalog item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed external lookup key extracted from field values, e.g.
/// `{ id_type: "isbn_13", id_value: "9780441013593" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub id_type: IdentifierKind,
    pub id_value: String,
}

impl Identifier {
    pub fn new(id_type: impl Into<IdentifierKind>, id_value: impl Into<String>) -> Self {
        Self {
            id_type: id_type.into(),
            id_value: id_value.into(),
        }
    }
}

/// One catalog item as returned by the persistence service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    /// Collection the item belongs to
    pub collection_id: Option<String>,

    /// Key of the module contract this item was created under
    pub module_id: String,

    /// Current lifecycle state key
    pub state_key: Option<String>,

    #[serde(default)]
    pub attributes: Attributes,

    #[serde(default)]
    pub identifiers: Vec<Identifier>,
}

impl Item {
    /// Attribute value by field key, if present.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
