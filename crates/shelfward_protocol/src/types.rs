//! Request/response bodies for the external services.
//!
//! All types use serde with snake_case keys. The engine treats these
//! as opaque JSON shapes; semantic interpretation (merge precedence,
//! diffing) lives in the engine crate.

use serde::{Deserialize, Serialize};
use shelfward_contract::{Attributes, Identifier};

/// Body of a provider lookup call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Module contract key the identifiers belong to
    pub module_id: String,

    /// Identifiers extracted from accumulated attribute values
    pub identifiers: Vec<Identifier>,

    /// Provider keys to query; empty means all enabled providers
    #[serde(default)]
    pub providers: Vec<String>,
}

/// What kind of thing an asset URL points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Other(String),
}

/// A downloadable asset returned by a provider, e.g. a cover scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub url: String,
    pub kind: AssetKind,

    /// Provider that supplied the asset
    pub provider_key: String,

    #[serde(default)]
    pub caption: Option<String>,
}

impl AssetRef {
    pub fn image(url: impl Into<String>, provider_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: AssetKind::Image,
            provider_key: provider_key.into(),
            caption: None,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == AssetKind::Image
    }
}

/// One provider's contribution to a lookup.
///
/// `error` is set when this provider failed; its siblings in the same
/// response are unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    pub provider_key: String,

    /// Suggested attribute values, keyed by contract field key
    #[serde(default)]
    pub field_values: Attributes,

    #[serde(default)]
    pub assets: Vec<AssetRef>,

    /// Human-readable failure message for this provider only
    #[serde(default)]
    pub error: Option<String>,
}

impl ProviderResult {
    pub fn new(provider_key: impl Into<String>) -> Self {
        Self {
            provider_key: provider_key.into(),
            field_values: Attributes::new(),
            assets: Vec::new(),
            error: None,
        }
    }

    pub fn with_values(mut self, field_values: Attributes) -> Self {
        self.field_values = field_values;
        self
    }

    pub fn with_asset(mut self, asset: AssetRef) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn failed(provider_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider_key: provider_key.into(),
            field_values: Attributes::new(),
            assets: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Full response of a lookup call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupResponse {
    /// Per-provider results in response order
    #[serde(default)]
    pub results: Vec<ProviderResult>,

    /// Provider key the server designates as the best match, if any
    #[serde(default)]
    pub best: Option<String>,

    /// Server-computed merge, when the server performed one
    #[serde(default)]
    pub merged_attributes: Option<Attributes>,

    /// Cross-provider asset list, when the server aggregated one
    #[serde(default)]
    pub assets: Vec<AssetRef>,
}

impl LookupResponse {
    /// All image assets across providers, response order, aggregated
    /// list first.
    pub fn image_assets(&self) -> Vec<&AssetRef> {
        self.assets
            .iter()
            .chain(self.results.iter().flat_map(|r| r.assets.iter()))
            .filter(|a| a.is_image())
            .collect()
    }

    /// Per-provider failures, for surfacing alongside the successes.
    pub fn provider_errors(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_deref().map(|e| (r.provider_key.as_str(), e)))
            .collect()
    }
}

/// Body of an item creation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDraft {
    pub module_id: String,

    #[serde(default)]
    pub collection_id: Option<String>,

    pub attributes: Attributes,

    /// Initial lifecycle state; server default applies when absent
    #[serde(default)]
    pub state_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_assets_filter_out_non_images() {
        let response = LookupResponse {
            results: vec![ProviderResult::new("openlib")
                .with_asset(AssetRef::image("https://x/cover.jpg", "openlib"))
                .with_asset(AssetRef {
                    url: "https://x/sample.pdf".to_string(),
                    kind: AssetKind::Other("pdf".to_string()),
                    provider_key: "openlib".to_string(),
                    caption: None,
                })],
            ..LookupResponse::default()
        };
        let images = response.image_assets();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url, "https://x/cover.jpg");
    }

    #[test]
    fn test_provider_errors_are_collected_per_provider() {
        let response = LookupResponse {
            results: vec![
                ProviderResult::new("a").with_values(
                    [("title".to_string(), json!("Dune"))].into_iter().collect(),
                ),
                ProviderResult::failed("b", "rate limited"),
            ],
            ..LookupResponse::default()
        };
        assert_eq!(response.provider_errors(), vec![("b", "rate limited")]);
    }

    #[test]
    fn test_lookup_request_roundtrip() {
        let req = LookupRequest {
            module_id: "books".to_string(),
            identifiers: vec![Identifier::new("isbn_13", "9780441013593")],
            providers: vec!["openlib".to_string()],
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: LookupRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.identifiers[0].id_value, "9780441013593");
    }
}
