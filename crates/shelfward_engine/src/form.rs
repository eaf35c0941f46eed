//! Headless dynamic form model.
//!
//! The model owns the current values map and the current inline error
//! map for one field list. Presentation is someone else's job: a UI
//! layer asks [`control_for`] which widget to draw per field and binds
//! edits back through [`FormModel::set_value`]. No per-type form code
//! exists anywhere - this model is the form, for every contract.
//!
//! Errors are re-validated on blur and on submit, not on every
//! keystroke; editing a field clears its existing error.

use crate::validate::{validate, validate_all, ValidationIssue};
use serde_json::Value;
use shelfward_contract::{Attributes, Contract, Field, FieldType};
use std::collections::BTreeMap;

/// Which widget renders a field. Closed dispatch: exactly one control
/// per field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldControl {
    Text,
    Number,
    Date,
    Checkbox,
    Select,
    TagList,
    Link,
    JsonEditor,
}

/// Map a field to its control. Unrecognized types degrade to plain
/// text entry rather than failing - an unknown future type must never
/// crash the form.
pub fn control_for(field: &Field) -> FieldControl {
    match field.field_type {
        FieldType::Text => FieldControl::Text,
        FieldType::Number => FieldControl::Number,
        FieldType::Date => FieldControl::Date,
        FieldType::Boolean => FieldControl::Checkbox,
        FieldType::Enum => FieldControl::Select,
        FieldType::Tags => FieldControl::TagList,
        FieldType::Link => FieldControl::Link,
        FieldType::Json => FieldControl::JsonEditor,
        FieldType::Unknown => FieldControl::Text,
    }
}

/// One contract-driven data-entry form.
#[derive(Debug, Clone)]
pub struct FormModel {
    fields: Vec<Field>,
    values: Attributes,
    errors: BTreeMap<String, ValidationIssue>,
}

impl FormModel {
    /// Form over an explicit field list. The list is taken as given -
    /// hidden flags are not re-checked here, the caller chose it.
    pub fn for_fields(fields: Vec<Field>, initial: Attributes) -> Self {
        Self {
            fields,
            values: initial,
            errors: BTreeMap::new(),
        }
    }

    /// Form over the contract's full visible field set.
    pub fn for_contract(contract: &Contract, initial: Attributes) -> Self {
        let fields = contract.visible_fields().into_iter().cloned().collect();
        Self::for_fields(fields, initial)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn values(&self) -> &Attributes {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn errors(&self) -> &BTreeMap<String, ValidationIssue> {
        &self.errors
    }

    pub fn error(&self, key: &str) -> Option<&ValidationIssue> {
        self.errors.get(key)
    }

    /// Update one value and clear its existing error. Validation does
    /// not run here; it runs on blur or submit.
    pub fn set_value(&mut self, key: &str, value: Value) {
        self.errors.remove(key);
        self.values.insert(key.to_string(), value);
    }

    /// Validate a single field, updating its inline error.
    pub fn validate_on_blur(&mut self, key: &str) {
        let Some(field) = self.fields.iter().find(|f| f.key == key) else {
            return;
        };
        let value = self.values.get(key).unwrap_or(&Value::Null);
        match validate(field, value) {
            Some(issue) => {
                self.errors.insert(key.to_string(), issue);
            }
            None => {
                self.errors.remove(key);
            }
        }
    }

    /// Parse JSON-typed fields whose raw value is still a string into
    /// structured data. A string that fails to parse is left as-is so
    /// validation rejects it explicitly instead of it vanishing.
    pub fn prepare_for_submit(&mut self) {
        for field in &self.fields {
            if field.field_type != FieldType::Json {
                continue;
            }
            let Some(Value::String(raw)) = self.values.get(&field.key) else {
                continue;
            };
            if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                self.values.insert(field.key.clone(), parsed);
            }
        }
    }

    /// Prepare, validate the full field set, and hand the values back
    /// only when clean. On failure the error map is populated and the
    /// caller gets it for inline rendering; no values leave the form.
    pub fn submit(&mut self) -> Result<Attributes, &BTreeMap<String, ValidationIssue>> {
        self.prepare_for_submit();
        self.errors = validate_all(self.fields.iter(), &self.values);
        if self.errors.is_empty() {
            Ok(self.values.clone())
        } else {
            Err(&self.errors)
        }
    }

    /// Fields grouped by `ui.group` for presentation. Group order is
    /// first-seen order among the field list, not contract declaration
    /// order; ungrouped fields collect under `None` at first sight.
    pub fn groups(&self) -> Vec<(Option<&str>, Vec<&Field>)> {
        let mut groups: Vec<(Option<&str>, Vec<&Field>)> = Vec::new();
        for field in &self.fields {
            let key = field.ui.group.as_deref();
            match groups.iter_mut().find(|(g, _)| *g == key) {
                Some((_, members)) => members.push(field),
                None => groups.push((key, vec![field])),
            }
        }
        groups
    }
}
