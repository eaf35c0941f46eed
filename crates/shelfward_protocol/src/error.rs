//! Errors crossing the service boundary.

use thiserror::Error;

/// Failure of a metadata lookup call as a whole.
///
/// Per-provider failures do NOT surface here - they travel inside
/// [`crate::types::ProviderResult::error`] so one provider's outage
/// never hides its siblings' results. This type is for the cases where
/// no result came back at all.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Lookup transport failed: {0}")]
    Transport(String),

    #[error("Lookup response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No providers are enabled for module '{0}'")]
    NoProviders(String),
}

/// Failure of an item persistence or contract retrieval call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service call failed: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}
