//! Client-Side Query Fallback
//!
//! Some backing stores only paginate. When the user asks for search,
//! filtering, or sorting anyway, this crate refines the current page
//! in memory, driven entirely by the contract's field flags - the same
//! flags the server would use if it could.
//!
//! Pipeline order is fixed: state filter, free-text search, structured
//! per-field filters, then sort. An inactive refinement passes the
//! server page through untouched.
//!
//! Known limitation: because only the current page is visible, the
//! refined `total` is the filtered count of that page, not a true
//! total across all pages. See [`RefinedPage`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shelfward_contract::{Contract, Item};
use std::cmp::Ordering;

/// Single-field sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

/// One structured filter against a filterable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldFilter {
    /// Value must be one of the given enum values
    EnumMembership { field: String, values: Vec<String> },

    /// Numeric value within the inclusive range
    NumberRange {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },

    /// Date value within the inclusive range
    DateRange {
        field: String,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },

    /// Case-insensitive substring match
    Substring { field: String, needle: String },
}

impl FieldFilter {
    fn field(&self) -> &str {
        match self {
            FieldFilter::EnumMembership { field, .. }
            | FieldFilter::NumberRange { field, .. }
            | FieldFilter::DateRange { field, .. }
            | FieldFilter::Substring { field, .. } => field,
        }
    }

    fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            FieldFilter::EnumMembership { values, .. } => match value {
                Some(Value::String(s)) => values.iter().any(|v| v == s),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|s| values.iter().any(|v| v == s)),
                _ => false,
            },
            FieldFilter::NumberRange { min, max, .. } => {
                let Some(n) = value.and_then(coerce_number) else {
                    return false;
                };
                min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m)
            }
            FieldFilter::DateRange { from, to, .. } => {
                let Some(d) = value.and_then(Value::as_str).and_then(parse_date) else {
                    return false;
                };
                from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t)
            }
            FieldFilter::Substring { needle, .. } => value
                .map(searchable_text)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
        }
    }
}

/// Active refinement requested by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRefinement {
    /// Lifecycle state keys to keep (case-insensitive); empty keeps all
    pub states: Vec<String>,

    /// Free-text needle searched across `searchable` fields
    pub search: Option<String>,

    pub filters: Vec<FieldFilter>,

    pub sort: Option<SortSpec>,
}

/// One refined page of results.
///
/// `total` counts the filtered CURRENT page only. It is not a true
/// total across all pages; the backing store cannot tell us that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinedPage {
    pub items: Vec<Item>,
    pub total: usize,
}

impl QueryRefinement {
    /// Whether any refinement is requested. When false, [`apply`]
    /// passes the server page and total through unchanged.
    ///
    /// [`apply`]: QueryRefinement::apply
    pub fn is_active(&self) -> bool {
        !self.states.is_empty()
            || self.search.as_deref().is_some_and(|s| !s.trim().is_empty())
            || !self.filters.is_empty()
            || self.sort.is_some()
    }

    /// Refine one page of items under the given contract.
    pub fn apply(&self, contract: &Contract, items: Vec<Item>, server_total: usize) -> RefinedPage {
        if !self.is_active() {
            return RefinedPage {
                items,
                total: server_total,
            };
        }

        let mut kept: Vec<Item> = items
            .into_iter()
            .filter(|item| self.keep_state(item))
            .filter(|item| self.keep_search(contract, item))
            .filter(|item| self.keep_filters(contract, item))
            .collect();

        if let Some(sort) = &self.sort {
            let sortable = contract
                .field(&sort.field)
                .is_some_and(|f| f.flags.sortable);
            if sortable {
                kept.sort_by(|a, b| {
                    compare_values(
                        a.attributes.get(&sort.field),
                        b.attributes.get(&sort.field),
                        sort.descending,
                    )
                });
            }
        }

        let total = kept.len();
        RefinedPage { items: kept, total }
    }

    fn keep_state(&self, item: &Item) -> bool {
        if self.states.is_empty() {
            return true;
        }
        let Some(state) = item.state_key.as_deref() else {
            return false;
        };
        self.states.iter().any(|s| s.eq_ignore_ascii_case(state))
    }

    fn keep_search(&self, contract: &Contract, item: &Item) -> bool {
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();
        contract.searchable_fields().iter().any(|field| {
            item.attributes
                .get(&field.key)
                .map(searchable_text)
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        })
    }

    fn keep_filters(&self, contract: &Contract, item: &Item) -> bool {
        self.filters.iter().all(|filter| {
            let filterable = contract
                .field(filter.field())
                .is_some_and(|f| f.flags.filterable);
            if !filterable {
                // Filters against unknown or unfilterable fields are
                // ignored rather than emptying the page.
                return true;
            }
            filter.matches(item.attributes.get(filter.field()))
        })
    }
}

/// Sort comparator: missing/null values sort last regardless of
/// direction; numbers compare numerically, everything else compares
/// as case-insensitive text.
fn compare_values(a: Option<&Value>, b: Option<&Value>, descending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ordering = match (coerce_number(x), coerce_number(y)) {
                (Some(nx), Some(ny)) => nx.partial_cmp(&ny).unwrap_or(Ordering::Equal),
                _ => searchable_text(x)
                    .to_lowercase()
                    .cmp(&searchable_text(y).to_lowercase()),
            };
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Flatten a value into the text the search and substring filters
/// scan. Array elements join on a space, each rendered through the
/// same scalar display form; objects are opaque.
fn searchable_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        other => scalar_text(other),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shelfward_contract::{Attributes, Field, FieldType, ItemId};

    fn contract() -> Contract {
        Contract::new("books", "Books")
            .with_field(Field::new("title", "Title", FieldType::Text).searchable().sortable())
            .with_field(Field::new("pages", "Pages", FieldType::Number).filterable().sortable())
            .with_field(Field::new("genre", "Genre", FieldType::Enum).filterable())
            .with_field(Field::new("published", "Published", FieldType::Date).filterable())
            .with_field(Field::new("tags", "Tags", FieldType::Tags).searchable())
            .with_field(Field::new("notes", "Notes", FieldType::Text))
    }

    fn item(state: &str, pairs: &[(&str, Value)]) -> Item {
        Item {
            id: ItemId::new(),
            collection_id: None,
            module_id: "books".to_string(),
            state_key: Some(state.to_string()),
            attributes: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<Attributes>(),
            identifiers: Vec::new(),
        }
    }

    fn titles(page: &RefinedPage) -> Vec<String> {
        page.items
            .iter()
            .map(|i| i.attributes.get("title").and_then(Value::as_str).unwrap_or("-").to_string())
            .collect()
    }

    #[test]
    fn test_inactive_refinement_passes_page_through() {
        let items = vec![item("owned", &[("title", json!("Dune"))])];
        let page = QueryRefinement::default().apply(&contract(), items, 250);
        assert_eq!(page.items.len(), 1);
        // Server total survives untouched.
        assert_eq!(page.total, 250);
    }

    #[test]
    fn test_state_filter_is_case_insensitive() {
        let refinement = QueryRefinement {
            states: vec!["OWNED".to_string()],
            ..QueryRefinement::default()
        };
        let items = vec![
            item("owned", &[("title", json!("Dune"))]),
            item("wishlist", &[("title", json!("Hyperion"))]),
        ];
        let page = refinement.apply(&contract(), items, 2);
        assert_eq!(titles(&page), vec!["Dune"]);
        // Total is the filtered count of this page, not a true total.
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_search_scans_only_searchable_fields() {
        let refinement = QueryRefinement {
            search: Some("spice".to_string()),
            ..QueryRefinement::default()
        };
        let items = vec![
            item("owned", &[("title", json!("The Spice Must Flow"))]),
            // "notes" is not flagged searchable; this must not match.
            item("owned", &[("title", json!("Hyperion")), ("notes", json!("spice?"))]),
        ];
        let page = refinement.apply(&contract(), items, 2);
        assert_eq!(titles(&page), vec!["The Spice Must Flow"]);
    }

    #[test]
    fn test_search_sees_non_string_array_elements() {
        let refinement = QueryRefinement {
            search: Some("1965".to_string()),
            ..QueryRefinement::default()
        };
        // The year tag is a JSON number, not a string.
        let items = vec![
            item("owned", &[("title", json!("Dune")), ("tags", json!(["classic", 1965]))]),
            item("owned", &[("title", json!("Hyperion")), ("tags", json!(["classic"]))]),
        ];
        let page = refinement.apply(&contract(), items, 2);
        assert_eq!(titles(&page), vec!["Dune"]);
    }

    #[test]
    fn test_enum_membership_filter() {
        let refinement = QueryRefinement {
            filters: vec![FieldFilter::EnumMembership {
                field: "genre".to_string(),
                values: vec!["sf".to_string()],
            }],
            ..QueryRefinement::default()
        };
        let items = vec![
            item("owned", &[("title", json!("Dune")), ("genre", json!("sf"))]),
            item("owned", &[("title", json!("Emma")), ("genre", json!("classic"))]),
        ];
        let page = refinement.apply(&contract(), items, 2);
        assert_eq!(titles(&page), vec!["Dune"]);
    }

    #[test]
    fn test_number_range_filter() {
        let refinement = QueryRefinement {
            filters: vec![FieldFilter::NumberRange {
                field: "pages".to_string(),
                min: Some(400.0),
                max: None,
            }],
            ..QueryRefinement::default()
        };
        let items = vec![
            item("owned", &[("title", json!("Dune")), ("pages", json!(412))]),
            item("owned", &[("title", json!("Novella")), ("pages", json!(120))]),
            item("owned", &[("title", json!("No Pages"))]),
        ];
        let page = refinement.apply(&contract(), items, 3);
        assert_eq!(titles(&page), vec!["Dune"]);
    }

    #[test]
    fn test_date_range_filter() {
        let refinement = QueryRefinement {
            filters: vec![FieldFilter::DateRange {
                field: "published".to_string(),
                from: parse_date("1960-01-01"),
                to: parse_date("1970-01-01"),
            }],
            ..QueryRefinement::default()
        };
        let items = vec![
            item("owned", &[("title", json!("Dune")), ("published", json!("1965-08-01"))]),
            item("owned", &[("title", json!("Hyperion")), ("published", json!("1989-05-26"))]),
        ];
        let page = refinement.apply(&contract(), items, 2);
        assert_eq!(titles(&page), vec!["Dune"]);
    }

    #[test]
    fn test_filter_on_unfilterable_field_is_ignored() {
        let refinement = QueryRefinement {
            filters: vec![FieldFilter::Substring {
                field: "title".to_string(), // searchable but not filterable
                needle: "zzz".to_string(),
            }],
            ..QueryRefinement::default()
        };
        let items = vec![item("owned", &[("title", json!("Dune"))])];
        let page = refinement.apply(&contract(), items, 1);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_sort_places_missing_values_last_both_directions() {
        let items = || {
            vec![
                item("owned", &[("title", json!("B")), ("pages", json!(500))]),
                item("owned", &[("title", json!("A"))]),
                item("owned", &[("title", json!("C")), ("pages", json!(100))]),
            ]
        };

        let asc = QueryRefinement {
            sort: Some(SortSpec {
                field: "pages".to_string(),
                descending: false,
            }),
            ..QueryRefinement::default()
        };
        let page = asc.apply(&contract(), items(), 3);
        assert_eq!(titles(&page), vec!["C", "B", "A"]);

        let desc = QueryRefinement {
            sort: Some(SortSpec {
                field: "pages".to_string(),
                descending: true,
            }),
            ..QueryRefinement::default()
        };
        let page = desc.apply(&contract(), items(), 3);
        // Direction flips the defined values; "A" still sorts last.
        assert_eq!(titles(&page), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_sort_compares_numbers_numerically() {
        let refinement = QueryRefinement {
            sort: Some(SortSpec {
                field: "pages".to_string(),
                descending: false,
            }),
            ..QueryRefinement::default()
        };
        // Lexicographic order would put "1000" before "9".
        let items = vec![
            item("owned", &[("title", json!("Long")), ("pages", json!("1000"))]),
            item("owned", &[("title", json!("Short")), ("pages", json!("9"))]),
        ];
        let page = refinement.apply(&contract(), items, 2);
        assert_eq!(titles(&page), vec!["Short", "Long"]);
    }

    #[test]
    fn test_pipeline_composes_in_order() {
        let refinement = QueryRefinement {
            states: vec!["owned".to_string()],
            search: Some("dune".to_string()),
            filters: vec![FieldFilter::NumberRange {
                field: "pages".to_string(),
                min: Some(100.0),
                max: None,
            }],
            sort: Some(SortSpec {
                field: "title".to_string(),
                descending: false,
            }),
        };
        let items = vec![
            item("owned", &[("title", json!("Dune Messiah")), ("pages", json!(256))]),
            item("owned", &[("title", json!("Dune")), ("pages", json!(412))]),
            item("wishlist", &[("title", json!("Dune")), ("pages", json!(412))]),
            item("owned", &[("title", json!("Hyperion")), ("pages", json!(482))]),
        ];
        let page = refinement.apply(&contract(), items, 4);
        assert_eq!(titles(&page), vec!["Dune", "Dune Messiah"]);
        assert_eq!(page.total, 2);
    }
}
