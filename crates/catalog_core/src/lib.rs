//! Catalog core - pure domain types shared by the catalog client and the
//! event handlers.
//!
//! Nothing in this crate performs I/O. The `CatalogClient` port lives in
//! `catalog_client`; handlers live in the `asset-reactor` root package.

pub mod asset;
pub mod error;
pub mod event;
pub mod patch;
pub mod playbook;
pub mod query;
pub mod typedef;
pub mod update;

pub use asset::{
    Asset, AssetAttributes, AssetRef, AssetSnapshot, CertificateStatus, Classification,
    CustomMetadata,
};
pub use error::CatalogError;
pub use event::{CatalogEvent, EventPayload};
pub use patch::Patch;
pub use playbook::{
    ActionOperator, ActionType, OwnersValue, Playbook, PlaybookAction, PlaybookActionSchema,
    PlaybookRule, PlaybookRuleConfig, WorkflowDefinition,
};
pub use query::{MutationResponse, Query, SearchRequest, SearchResponse};
pub use typedef::{
    AttributeDef, BadgeColor, BadgeComparison, BadgeCondition, BadgeDef, CustomMetadataDef,
};
pub use update::AssetUpdate;
