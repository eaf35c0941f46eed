//! Field validation engine.
//!
//! Pure functions from `(field, value)` to an issue or nothing.
//! Evaluation order is fixed: the required check short-circuits, an
//! empty optional value short-circuits clean, and only then do the
//! type-specific checks run. Identical inputs always yield identical
//! results; there is no hidden state anywhere in this module.

use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value;
use shelfward_contract::{Attributes, Field, FieldType};
use std::collections::BTreeMap;
use tracing::warn;

/// What kind of rule a value violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Required,
    NotText,
    TooShort,
    TooLong,
    Pattern,
    NotANumber,
    OutOfRange,
    NotADate,
    DateOutOfRange,
    NotJson,
}

/// One per-field validation failure.
///
/// Rendered inline next to the field, never as a toast; an issue on
/// any visible field blocks form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// True for the values the engine treats as "nothing entered":
/// null, blank or whitespace-only strings, and empty arrays.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Validate one value against one field definition.
pub fn validate(field: &Field, value: &Value) -> Option<ValidationIssue> {
    let empty = is_empty_value(value);
    if field.flags.required && empty {
        return Some(ValidationIssue::new(
            IssueKind::Required,
            format!("{} is required", field.label),
        ));
    }
    if empty {
        return None;
    }

    match field.field_type {
        FieldType::Text => validate_text(field, value),
        FieldType::Number => validate_number(field, value),
        FieldType::Date => validate_date(field, value),
        FieldType::Json => validate_json(field, value),
        // ENUM selections are not checked against `enum_values`; the
        // original engine never did, and consumers may rely on values
        // that predate an enum edit. Flagged rather than fixed.
        FieldType::Enum => None,
        // TAGS beyond the required/non-empty rule, BOOLEAN, LINK, and
        // unrecognized types carry no type-specific checks.
        FieldType::Tags | FieldType::Boolean | FieldType::Link | FieldType::Unknown => None,
    }
}

/// Validate a whole attribute map against a field list. Missing keys
/// validate as null (so required fields still fail).
pub fn validate_all<'a, I>(fields: I, attributes: &Attributes) -> BTreeMap<String, ValidationIssue>
where
    I: IntoIterator<Item = &'a Field>,
{
    let mut issues = BTreeMap::new();
    for field in fields {
        let value = attributes.get(&field.key).unwrap_or(&Value::Null);
        if let Some(issue) = validate(field, value) {
            issues.insert(field.key.clone(), issue);
        }
    }
    issues
}

fn validate_text(field: &Field, value: &Value) -> Option<ValidationIssue> {
    let Some(text) = value.as_str() else {
        // A non-string in a TEXT field would silently dodge the
        // length and pattern checks below.
        return Some(ValidationIssue::new(
            IssueKind::NotText,
            format!("{} must be text", field.label),
        ));
    };
    let len = text.chars().count();

    if let Some(min) = field.constraints.min_length {
        if len < min {
            return Some(ValidationIssue::new(
                IssueKind::TooShort,
                format!("{} must be at least {min} characters", field.label),
            ));
        }
    }
    if let Some(max) = field.constraints.max_length {
        if len > max {
            return Some(ValidationIssue::new(
                IssueKind::TooLong,
                format!("{} must be at most {max} characters", field.label),
            ));
        }
    }
    if let Some(pattern) = &field.constraints.pattern {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(text) {
                    return Some(ValidationIssue::new(
                        IssueKind::Pattern,
                        format!("{} has an invalid format", field.label),
                    ));
                }
            }
            Err(err) => {
                // A broken contract pattern must not brick the form.
                warn!(field = %field.key, %err, "unparseable pattern constraint skipped");
            }
        }
    }
    None
}

fn validate_number(field: &Field, value: &Value) -> Option<ValidationIssue> {
    let number = coerce_number(value);
    let number = match number {
        Some(n) if n.is_finite() => n,
        _ => {
            return Some(ValidationIssue::new(
                IssueKind::NotANumber,
                format!("{} must be a number", field.label),
            ))
        }
    };

    if let Some(min) = field.constraints.min {
        if number < min {
            return Some(ValidationIssue::new(
                IssueKind::OutOfRange,
                format!("{} must be at least {min}", field.label),
            ));
        }
    }
    if let Some(max) = field.constraints.max {
        if number > max {
            return Some(ValidationIssue::new(
                IssueKind::OutOfRange,
                format!("{} must be at most {max}", field.label),
            ));
        }
    }
    None
}

/// Numeric coercion: JSON numbers pass through, strings are parsed.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn validate_date(field: &Field, value: &Value) -> Option<ValidationIssue> {
    let raw = match value.as_str() {
        Some(raw) => raw,
        None => {
            return Some(ValidationIssue::new(
                IssueKind::NotADate,
                format!("{} must be a date", field.label),
            ))
        }
    };
    let date = match parse_date(raw) {
        Some(date) => date,
        None => {
            return Some(ValidationIssue::new(
                IssueKind::NotADate,
                format!("{} must be a valid date (YYYY-MM-DD)", field.label),
            ))
        }
    };

    if let Some(min) = field.constraints.min_date.as_deref().and_then(parse_date) {
        if date < min {
            return Some(ValidationIssue::new(
                IssueKind::DateOutOfRange,
                format!("{} must not be before {min}", field.label),
            ));
        }
    }
    if let Some(max) = field.constraints.max_date.as_deref().and_then(parse_date) {
        if date > max {
            return Some(ValidationIssue::new(
                IssueKind::DateOutOfRange,
                format!("{} must not be after {max}", field.label),
            ));
        }
    }
    None
}

/// ISO calendar date, `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn validate_json(field: &Field, value: &Value) -> Option<ValidationIssue> {
    // Raw string input must parse; already-structured values are fine.
    if let Value::String(raw) = value {
        if serde_json::from_str::<Value>(raw).is_err() {
            return Some(ValidationIssue::new(
                IssueKind::NotJson,
                format!("{} must be valid JSON", field.label),
            ));
        }
    }
    None
}
