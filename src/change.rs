//! Change detection and update submission.

use std::sync::Arc;

use catalog_client::CatalogClient;
use catalog_core::{Asset, AssetUpdate};
use tracing::{debug, error, info};

use crate::error::{ReactorError, Result};

/// Attributes a playbook may mutate, in the order they are compared.
pub const MUTABLE_ATTRIBUTES: &[&str] = &[
    "description",
    "userDescription",
    "certificateStatus",
    "ownerUsers",
    "ownerGroups",
    "meanings",
    "classifications",
];

/// Decides whether a mutated copy differs from the asset it started from.
///
/// Only [`MUTABLE_ATTRIBUTES`] are compared. Absent and empty are distinct:
/// an asset whose owners went from `{}` to unset has changed.
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn has_changes(original: &Asset, mutated: &Asset) -> bool {
        Self::changed_attributes(original, mutated).next().is_some()
    }

    pub fn changed_attributes<'a>(
        original: &'a Asset,
        mutated: &'a Asset,
    ) -> impl Iterator<Item = &'static str> + 'a {
        MUTABLE_ATTRIBUTES
            .iter()
            .copied()
            .filter(move |attribute| differs(original, mutated, attribute))
    }
}

fn differs(a: &Asset, b: &Asset, attribute: &str) -> bool {
    let (x, y) = (&a.attributes, &b.attributes);
    match attribute {
        "description" => x.description != y.description,
        "userDescription" => x.user_description != y.user_description,
        "certificateStatus" => x.certificate_status != y.certificate_status,
        "ownerUsers" => x.owner_users != y.owner_users,
        "ownerGroups" => x.owner_groups != y.owner_groups,
        "meanings" => x.meanings != y.meanings,
        "classifications" => a.classifications != b.classifications,
        _ => false,
    }
}

/// Submits a trimmed update and checks the catalog accepted it.
#[derive(Clone)]
pub struct UpdateApplier {
    client: Arc<dyn CatalogClient>,
}

impl UpdateApplier {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self { client }
    }

    pub async fn apply(&self, update: &AssetUpdate) -> Result<()> {
        debug!(
            guid = %update.guid,
            fields = ?update.touched_fields(),
            "submitting asset update"
        );
        let response = self.client.update_asset(update).await?;
        if !response.was_updated(&update.guid) {
            error!(
                guid = %update.guid,
                qualified_name = %update.qualified_name,
                "Update was accepted but the asset is not listed as updated"
            );
            return Err(ReactorError::UpdateRejected {
                guid: update.guid.clone(),
            });
        }
        info!(
            guid = %update.guid,
            type_name = %update.type_name,
            qualified_name = %update.qualified_name,
            "Updated asset"
        );
        Ok(())
    }
}
