//! Service ports.
//!
//! Each port is an object-safe async trait the host implements over
//! its real transport. The engine takes `&dyn` references, so tests
//! run against small hand-written fakes and no live server.

use crate::error::{LookupError, ServiceError};
use crate::types::{ItemDraft, LookupRequest, LookupResponse};
use async_trait::async_trait;
use shelfward_contract::{Contract, Item, ItemId};

/// External metadata provider gateway.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Fan a lookup out to the requested providers and collect their
    /// results. Individual provider failures are reported inside the
    /// response; an `Err` here means no result came back at all.
    async fn lookup(&self, request: &LookupRequest) -> Result<LookupResponse, LookupError>;
}

/// Item persistence gateway.
///
/// The two image calls are mutually exclusive per save and apply only
/// after `create_item` has succeeded.
#[async_trait]
pub trait ItemService: Send + Sync {
    /// Create a new catalog item.
    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, ServiceError>;

    /// Attach an image to an existing item from a remote URL.
    async fn set_image_url(&self, item_id: ItemId, url: &str) -> Result<Item, ServiceError>;

    /// Attach an image to an existing item from uploaded bytes.
    async fn upload_image(
        &self,
        item_id: ItemId,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<Item, ServiceError>;
}

/// Contract retrieval gateway.
///
/// Consumed once per module selection; the returned contract is
/// treated as immutable for the consumer's lifetime.
#[async_trait]
pub trait ContractSource: Send + Sync {
    async fn contract(&self, module_key: &str) -> Result<Contract, ServiceError>;
}
