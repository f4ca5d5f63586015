//! Verification enforcer: a verified asset must be described, owned and
//! have lineage, or it is downgraded to draft.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use catalog_client::CatalogClient;
use catalog_core::{Asset, AssetUpdate, CatalogEvent, CertificateStatus, Patch};
use tracing::info;

use super::{EventHandler, HandlerOutcome};
use crate::change::UpdateApplier;
use crate::envelope::require_snapshot;
use crate::error::{ReactorError, Result};
use crate::predicates::{has_description, has_lineage, has_owner};
use crate::resolver::AssetResolver;
use crate::routing::Route;

pub const ENFORCEMENT_MESSAGE: &str =
    "To be verified, an asset must have a description, at least one owner, and lineage.";

const REQUIRED_ATTRIBUTES: &[&str] = &[
    "description",
    "userDescription",
    "ownerUsers",
    "ownerGroups",
    "__hasLineage",
    "inputToProcesses",
    "outputFromProcesses",
    "certificateStatus",
];

/// The downgrade to issue for `asset`, if any.
pub fn enforcement_update(asset: &Asset) -> Option<AssetUpdate> {
    if asset.attributes.certificate_status != Some(CertificateStatus::Verified) {
        return None;
    }
    if has_description(asset) && has_owner(asset) && has_lineage(asset) {
        return None;
    }
    let mut update = AssetUpdate::trim_to_required(asset);
    update.certificate_status = Patch::Set(CertificateStatus::Draft);
    update.certificate_status_message = Patch::Set(ENFORCEMENT_MESSAGE.to_string());
    Some(update)
}

pub struct VerificationEnforcer {
    resolver: AssetResolver,
    applier: UpdateApplier,
}

impl VerificationEnforcer {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self {
            resolver: AssetResolver::new(client.clone()),
            applier: UpdateApplier::new(client),
        }
    }
}

#[async_trait]
impl EventHandler for VerificationEnforcer {
    fn name(&self) -> &'static str {
        "enforcer"
    }

    async fn handle(&self, event: &CatalogEvent, _picked_up_at: Instant) -> Result<HandlerOutcome> {
        let snapshot = require_snapshot(event)?;
        let asset = self
            .resolver
            .resolve_view(snapshot, REQUIRED_ATTRIBUTES, false, false)
            .await?
            .ok_or_else(|| ReactorError::not_found(snapshot.guid.clone()))?;

        let Some(update) = enforcement_update(&asset) else {
            return Ok(HandlerOutcome::Unchanged);
        };
        info!(
            qualified_name = %asset.qualified_name(),
            "Verified asset is missing enrichment - reverting to draft"
        );
        self.applier.apply(&update).await?;
        Ok(HandlerOutcome::Updated)
    }

    fn quiet_route(&self) -> Route {
        Route::Drop
    }
}
