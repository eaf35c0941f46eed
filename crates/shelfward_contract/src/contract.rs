//! The contract aggregate.
//!
//! A contract is loaded once per module selection and treated as
//! immutable by every consumer. Lookup helpers here are the only place
//! that interprets contract structure; the engine and query crates go
//! through them rather than scanning the vectors directly.

use crate::field::Field;
use crate::workflow::Workflow;
use serde::{Deserialize, Serialize};

/// One lifecycle state an item may be in, e.g. "wishlist" or "owned".
///
/// A deprecated state is still displayable on existing items but must
/// not be offered for new assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleState {
    pub key: String,
    pub label: String,

    /// Display order among the contract's states
    #[serde(default)]
    pub order: i32,

    /// Whether items in this state count as "in the collection"
    #[serde(default)]
    pub active: bool,

    /// Kept for display on existing items, not selectable for new ones
    #[serde(default)]
    pub deprecated: bool,
}

impl LifecycleState {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            order: 0,
            active: true,
            deprecated: false,
        }
    }
}

/// Reference to an external metadata provider enabled for a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRef {
    pub key: String,
    pub label: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProviderRef {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            enabled: true,
        }
    }
}

/// Schema describing one catalog item type.
///
/// Identified by `key`; `version` exists for compatibility checks by
/// the store and is not enforced here. Field keys are unique within a
/// contract - the store guarantees it, consumers rely on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Unique module key, e.g. "books"
    pub key: String,

    /// Contract version, incremented by the store on edit
    #[serde(default)]
    pub version: u32,

    /// Human-readable module label
    pub label: String,

    #[serde(default)]
    pub fields: Vec<Field>,

    #[serde(default)]
    pub states: Vec<LifecycleState>,

    #[serde(default)]
    pub providers: Vec<ProviderRef>,

    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

impl Contract {
    /// Create an empty contract with the given key and label.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: 1,
            label: label.into(),
            fields: Vec::new(),
            states: Vec::new(),
            providers: Vec::new(),
            workflows: Vec::new(),
        }
    }

    /// Add a field
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a lifecycle state
    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.states.push(state);
        self
    }

    /// Add a provider reference
    pub fn with_provider(mut self, provider: ProviderRef) -> Self {
        self.providers.push(provider);
        self
    }

    /// Add a workflow
    pub fn with_workflow(mut self, workflow: Workflow) -> Self {
        self.workflows.push(workflow);
        self
    }

    /// Field by key.
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Workflow by key.
    pub fn workflow(&self, key: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.key == key)
    }

    /// Fields shown on a contract-driven form, hidden ones excluded,
    /// in declared `flags.order`.
    pub fn visible_fields(&self) -> Vec<&Field> {
        let mut fields: Vec<&Field> = self.fields.iter().filter(|f| !f.ui.hidden).collect();
        fields.sort_by_key(|f| f.flags.order);
        fields
    }

    /// Fields participating in free-text search.
    pub fn searchable_fields(&self) -> Vec<&Field> {
        self.fields.iter().filter(|f| f.flags.searchable).collect()
    }

    /// States offered for new assignments: deprecated ones excluded,
    /// ordered by `order`.
    pub fn selectable_states(&self) -> Vec<&LifecycleState> {
        let mut states: Vec<&LifecycleState> =
            self.states.iter().filter(|s| !s.deprecated).collect();
        states.sort_by_key(|s| s.order);
        states
    }

    /// Providers currently enabled for lookup.
    pub fn enabled_providers(&self) -> Vec<&ProviderRef> {
        self.providers.iter().filter(|p| p.enabled).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    fn book_contract() -> Contract {
        Contract::new("books", "Books")
            .with_field(Field::new("title", "Title", FieldType::Text).required())
            .with_field(Field::new("isbn", "ISBN", FieldType::Text).searchable())
            .with_field(Field::new("internal_rank", "Rank", FieldType::Number).hidden())
            .with_state(LifecycleState::new("owned", "Owned"))
            .with_state(LifecycleState {
                deprecated: true,
                ..LifecycleState::new("lost", "Lost")
            })
    }

    #[test]
    fn test_field_lookup() {
        let contract = book_contract();
        assert!(contract.field("title").is_some());
        assert!(contract.field("missing").is_none());
    }

    #[test]
    fn test_visible_fields_exclude_hidden() {
        let contract = book_contract();
        let keys: Vec<&str> = contract.visible_fields().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["title", "isbn"]);
    }

    #[test]
    fn test_selectable_states_exclude_deprecated() {
        let contract = book_contract();
        let keys: Vec<&str> = contract
            .selectable_states()
            .iter()
            .map(|s| s.key.as_str())
            .collect();
        assert_eq!(keys, vec!["owned"]);
    }

    #[test]
    fn test_contract_roundtrips_through_json() {
        let contract = book_contract();
        let json = serde_json::to_string(&contract).unwrap();
        let parsed: Contract = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.key, "books");
        assert_eq!(parsed.fields.len(), 3);
        assert_eq!(parsed.states.len(), 2);
    }
}
