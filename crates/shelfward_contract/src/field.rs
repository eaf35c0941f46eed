//! Field definitions.
//!
//! A field is one typed, named attribute of a contract. Its `FieldType`
//! decides which constraint, validation, and rendering rules apply -
//! every consumer dispatches on the type tag, never on the field key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of field types a contract may declare.
///
/// Wire values are SCREAMING_CASE (`"TEXT"`, `"NUMBER"`, ...). A tag
/// this build does not recognize deserializes to [`FieldType::Unknown`]
/// rather than failing: an unknown future type must degrade to plain
/// text entry, never crash the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Date,
    Boolean,
    Enum,
    Tags,
    Link,
    Json,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "TEXT",
            FieldType::Number => "NUMBER",
            FieldType::Date => "DATE",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Enum => "ENUM",
            FieldType::Tags => "TAGS",
            FieldType::Link => "LINK",
            FieldType::Json => "JSON",
            FieldType::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

/// Behavioral flags controlling where a field participates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldFlags {
    /// Empty values fail validation
    pub required: bool,

    /// Free-text search scans this field
    pub searchable: bool,

    /// Structured filters may target this field
    pub filterable: bool,

    /// Result sets may be ordered by this field
    pub sortable: bool,

    /// Display order among the contract's fields
    pub order: i32,
}

/// Type-specific validation constraints. All optional; which ones are
/// honored depends on the field type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldConstraints {
    /// Minimum string length (TEXT)
    pub min_length: Option<usize>,

    /// Maximum string length (TEXT)
    pub max_length: Option<usize>,

    /// Regex the full value must match (TEXT)
    pub pattern: Option<String>,

    /// Numeric lower bound, inclusive (NUMBER)
    pub min: Option<f64>,

    /// Numeric upper bound, inclusive (NUMBER)
    pub max: Option<f64>,

    /// Earliest accepted date, ISO `YYYY-MM-DD` (DATE)
    pub min_date: Option<String>,

    /// Latest accepted date, ISO `YYYY-MM-DD` (DATE)
    pub max_date: Option<String>,

    /// Whether an ENUM field accepts multiple selections
    pub multi: bool,
}

/// Presentation hints. The engine only interprets `hidden` and `group`;
/// the rest passes through to whatever renders the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldUi {
    pub placeholder: Option<String>,
    pub help_text: Option<String>,

    /// Fields sharing a group render together; group order is
    /// first-seen order among the field list
    pub group: Option<String>,

    /// Hidden fields are excluded from contract-driven forms
    pub hidden: bool,
}

/// A kind of external lookup key, e.g. `isbn_13` or `ean`.
///
/// Declared per field so the lookup step can map accumulated attribute
/// values to provider identifiers without hardcoding field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierKind(pub String);

impl IdentifierKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdentifierKind {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One typed attribute declared by a contract.
///
/// `key` is unique within the owning contract. Attribute maps on items
/// should use these keys, though unknown keys are preserved and
/// rendered generically rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    /// Unique key within the contract
    pub key: String,

    /// Human-readable label
    pub label: String,

    /// Type tag deciding validation and rendering rules
    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub flags: FieldFlags,

    #[serde(default)]
    pub constraints: FieldConstraints,

    /// Allowed values for ENUM fields (selection is not validated
    /// against this list; see the validation engine)
    #[serde(default)]
    pub enum_values: Vec<String>,

    /// Identifier kinds this field's value can supply for lookup
    #[serde(default)]
    pub identifiers: Vec<IdentifierKind>,

    #[serde(default)]
    pub ui: FieldUi,
}

impl Field {
    /// Create a field with the given key, label, and type; everything
    /// else defaults.
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            flags: FieldFlags::default(),
            constraints: FieldConstraints::default(),
            enum_values: Vec::new(),
            identifiers: Vec::new(),
            ui: FieldUi::default(),
        }
    }

    /// Mark the field required
    pub fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }

    /// Mark the field searchable
    pub fn searchable(mut self) -> Self {
        self.flags.searchable = true;
        self
    }

    /// Mark the field filterable
    pub fn filterable(mut self) -> Self {
        self.flags.filterable = true;
        self
    }

    /// Mark the field sortable
    pub fn sortable(mut self) -> Self {
        self.flags.sortable = true;
        self
    }

    /// Set validation constraints
    pub fn with_constraints(mut self, constraints: FieldConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Set allowed ENUM values
    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = values;
        self
    }

    /// Declare an identifier kind this field supplies
    pub fn with_identifier(mut self, kind: impl Into<IdentifierKind>) -> Self {
        self.identifiers.push(kind.into());
        self
    }

    /// Set UI hints
    pub fn with_ui(mut self, ui: FieldUi) -> Self {
        self.ui = ui;
        self
    }

    /// Place the field in a presentation group
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.ui.group = Some(group.into());
        self
    }

    /// Hide the field from contract-driven forms
    pub fn hidden(mut self) -> Self {
        self.ui.hidden = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_wire_tags() {
        assert_eq!(
            serde_json::to_string(&FieldType::Text).unwrap(),
            "\"TEXT\""
        );
        let parsed: FieldType = serde_json::from_str("\"NUMBER\"").unwrap();
        assert_eq!(parsed, FieldType::Number);
    }

    #[test]
    fn test_unrecognized_field_type_degrades_to_unknown() {
        let parsed: FieldType = serde_json::from_str("\"HOLOGRAM\"").unwrap();
        assert_eq!(parsed, FieldType::Unknown);
    }

    #[test]
    fn test_field_builder() {
        let field = Field::new("isbn", "ISBN", FieldType::Text)
            .required()
            .searchable()
            .with_identifier("isbn_13")
            .in_group("Identification");

        assert!(field.flags.required);
        assert!(field.flags.searchable);
        assert!(!field.flags.filterable);
        assert_eq!(field.identifiers, vec![IdentifierKind::new("isbn_13")]);
        assert_eq!(field.ui.group.as_deref(), Some("Identification"));
    }

    #[test]
    fn test_field_deserializes_with_sparse_json() {
        let json = r#"{"key": "title", "label": "Title", "type": "TEXT"}"#;
        let field: Field = serde_json::from_str(json).unwrap();
        assert_eq!(field.key, "title");
        assert!(!field.flags.required);
        assert!(field.enum_values.is_empty());
        assert!(!field.ui.hidden);
    }
}
