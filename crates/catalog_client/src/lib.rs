//! CatalogClient trait - the sole API boundary between the handlers and the
//! metadata catalog.
//!
//! `HttpCatalogClient` talks to a live catalog; `InMemoryCatalog` is an
//! in-process stand-in whose search index can be made to lag behind its
//! authoritative store.

pub mod http;
pub mod inmemory;

use async_trait::async_trait;
use catalog_core::{
    Asset, AssetUpdate, BadgeDef, CatalogError, CustomMetadataDef, MutationResponse,
    SearchRequest, SearchResponse, WorkflowDefinition,
};

pub use http::HttpCatalogClient;
pub use inmemory::InMemoryCatalog;

pub type Result<T> = std::result::Result<T, CatalogError>;

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Point lookup against the authoritative store. Always reflects the
    /// latest write. `Ok(None)` when no asset has this guid.
    async fn get_asset(&self, guid: &str) -> Result<Option<Asset>>;

    /// Query the search index. May lag behind the authoritative store.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;

    /// Partial update: only the fields touched in `update` are written.
    async fn update_asset(&self, update: &AssetUpdate) -> Result<MutationResponse>;

    /// Look up a custom-metadata definition by its display name.
    async fn get_custom_metadata_def(&self, display_name: &str)
        -> Result<Option<CustomMetadataDef>>;

    /// Create a custom-metadata definition. Answers `CatalogError::Conflict`
    /// when one with the same display name already exists.
    async fn create_custom_metadata_def(
        &self,
        def: &CustomMetadataDef,
    ) -> Result<CustomMetadataDef>;

    /// Create (or overwrite) the badge for one custom-metadata attribute.
    async fn create_badge(&self, badge: &BadgeDef) -> Result<MutationResponse>;

    /// First `max` playbook workflow definitions.
    async fn list_playbooks(&self, max: usize) -> Result<Vec<WorkflowDefinition>>;
}
