//! Wire types and service ports.
//!
//! The engine consumes three remote collaborators: a provider lookup
//! service, an item persistence service, and a contract source. This
//! crate owns the JSON request/response shapes for those calls and the
//! async traits (`ports`) behind which the transports live.
//!
//! Nothing here performs I/O. Transports and authentication belong to
//! the host application; the engine only sees these traits.
//!
//! # Modules
//!
//! - [`types`]: Request/response bodies (lookup, item draft, assets)
//! - [`ports`]: `MetadataService`, `ItemService`, `ContractSource`
//! - [`error`]: `LookupError` and `ServiceError`

pub mod error;
pub mod ports;
pub mod types;

pub use error::{LookupError, ServiceError};
pub use ports::{ContractSource, ItemService, MetadataService};
pub use types::{
    AssetKind, AssetRef, ItemDraft, LookupRequest, LookupResponse, ProviderResult,
};
