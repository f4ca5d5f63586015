//! Asset state resolution.
//!
//! Two ways to re-read an asset named by an event:
//!
//! - [`AssetResolver::resolve_full`] - point lookup by guid against the
//!   authoritative store. Always current, more expensive.
//! - [`AssetResolver::resolve_view`] - scoped index search by type and
//!   qualified name. Cheaper and projected to the attributes asked for, but
//!   may lag the latest write.
//!
//! Both answer `Ok(None)` when the asset does not (yet) exist in the source
//! they read.

use std::sync::Arc;

use catalog_client::CatalogClient;
use catalog_core::{Asset, AssetSnapshot, Query, SearchRequest};
use tracing::{debug, warn};

use crate::error::{ReactorError, Result};

/// Attributes some asset types refuse an update without.
const UPDATE_REQUIRED_ATTRIBUTES: &[&str] = &["anchor", "awsArn"];

#[derive(Clone)]
pub struct AssetResolver {
    client: Arc<dyn CatalogClient>,
}

impl AssetResolver {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self { client }
    }

    pub async fn resolve_full(&self, guid: &str) -> Result<Option<Asset>> {
        debug!(guid, "resolving full asset");
        Ok(self.client.get_asset(guid).await?)
    }

    pub async fn resolve_view(
        &self,
        snapshot: &AssetSnapshot,
        attributes: &[&str],
        include_terms: bool,
        include_classifications: bool,
    ) -> Result<Option<Asset>> {
        let qualified_name = snapshot.qualified_name().ok_or_else(|| {
            ReactorError::decode(format!(
                "asset {} in event has no qualifiedName",
                snapshot.guid
            ))
        })?;

        let request = SearchRequest::new(Query::all([
            Query::active(),
            Query::of_type(&snapshot.type_name),
            Query::qualified_name(qualified_name),
        ]))
        .attributes(attributes.iter().copied())
        .attributes(UPDATE_REQUIRED_ATTRIBUTES.iter().copied())
        .relation_attribute("guid")
        .include_meanings(include_terms)
        .include_classifications(include_classifications);

        let response = self.client.search(&request).await?;
        if response.entities.len() > 1 {
            warn!(
                type_name = %snapshot.type_name,
                qualified_name,
                count = response.entities.len(),
                "Multiple assets found with the same qualifiedName, using only the first"
            );
        }
        Ok(response.entities.into_iter().next())
    }
}
