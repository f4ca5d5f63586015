//! Data-as-a-Product completeness score.
//!
//! Five binary enrichment indicators collapse into a score in [0, 100],
//! stored as the `Score` attribute of the `DaaP` custom-metadata set. The
//! set's definition (and a colour badge over the score) is created on
//! first use. The catalog addresses custom metadata by the internal names
//! it assigned, so every read and write goes through those, never the
//! display names.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use catalog_client::CatalogClient;
use catalog_core::{
    Asset, AssetUpdate, AttributeDef, BadgeColor, BadgeComparison, BadgeDef, CatalogError,
    CatalogEvent, CustomMetadataDef,
};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::{EventHandler, HandlerOutcome};
use crate::change::UpdateApplier;
use crate::envelope::require_snapshot;
use crate::error::{ReactorError, Result};
use crate::predicates::{
    has_assigned_terms, has_classifications, has_description, has_lineage, has_owner,
};
use crate::resolver::AssetResolver;

pub const CM_DAAP: &str = "DaaP";
pub const CM_ATTR_SCORE: &str = "Score";

const SCORE_EMOJI: &str = "\u{1F516}";

const BADGE_DESCRIPTION: &str = "Data as a Product completeness score. Indicates how enriched and ready for re-use this asset is, out of a total possible score of 100.";

const SCORED_ATTRIBUTES: &[&str] = &[
    "description",
    "userDescription",
    "ownerUsers",
    "ownerGroups",
    "meanings",
    "assignedTerms",
    "__hasLineage",
    "classifications",
    "inputToProcesses",
    "outputFromProcesses",
];

fn indicator(present: bool) -> f64 {
    if present {
        1.0
    } else {
        0.0
    }
}

/// Completeness score for an asset as resolved.
///
/// Glossary objects drop the lineage indicator. Both formulas divide by 4,
/// so a non-glossary asset with all five indicators scores 125.
pub fn compute_score(asset: &Asset) -> f64 {
    let description = indicator(has_description(asset));
    let owner = indicator(has_owner(asset));
    let terms = indicator(has_assigned_terms(asset));
    let classifications = indicator(has_classifications(asset));

    let sum = if asset.is_glossary_type() {
        description + owner + terms + classifications
    } else {
        description + owner + indicator(has_lineage(asset)) + terms + classifications
    };
    sum / 4.0 * 100.0
}

/// Internal names of the score attribute, as assigned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScoreField {
    set_id: String,
    attribute_id: String,
}

impl ScoreField {
    fn from_def(def: &CustomMetadataDef) -> Result<Self> {
        let (set_id, attribute_id) = def.internal_names(CM_ATTR_SCORE).ok_or_else(|| {
            error!(set = %def.display_name, "DaaP definition has no internal name for Score");
            ReactorError::Api(CatalogError::NotFound(format!("{CM_DAAP}.{CM_ATTR_SCORE}")))
        })?;
        Ok(Self {
            set_id: set_id.to_string(),
            attribute_id: attribute_id.to_string(),
        })
    }

    /// Attribute name for index projections.
    fn projection(&self) -> String {
        format!("{}.{}", self.set_id, self.attribute_id)
    }

    fn stored(&self, asset: &Asset) -> Option<f64> {
        asset
            .custom_metadata_value(&self.set_id, &self.attribute_id)
            .and_then(Value::as_f64)
    }

    fn write(&self, update: &mut AssetUpdate, score: f64) {
        update.custom_metadata.insert(
            self.set_id.clone(),
            BTreeMap::from([(self.attribute_id.clone(), Value::from(score))]),
        );
    }
}

pub struct ScoreCalculator {
    client: Arc<dyn CatalogClient>,
    resolver: AssetResolver,
    applier: UpdateApplier,
    score_field: OnceCell<ScoreField>,
}

impl ScoreCalculator {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self {
            resolver: AssetResolver::new(client.clone()),
            applier: UpdateApplier::new(client.clone()),
            client,
            score_field: OnceCell::new(),
        }
    }

    /// The score attribute's internal names, creating the `DaaP` definition
    /// if the catalog does not have it yet.
    async fn ensure_definition(&self) -> Result<&ScoreField> {
        self.score_field
            .get_or_try_init(|| self.fetch_or_create_definition())
            .await
    }

    async fn fetch_or_create_definition(&self) -> Result<ScoreField> {
        if let Some(existing) = self.client.get_custom_metadata_def(CM_DAAP).await? {
            debug!(name = %existing.name, "DaaP custom metadata already defined");
            return ScoreField::from_def(&existing);
        }
        let def = CustomMetadataDef::creator(CM_DAAP)
            .attribute(
                AttributeDef::decimal(CM_ATTR_SCORE)
                    .described("Data as a Product completeness score for this asset"),
            )
            .emoji(SCORE_EMOJI);
        match self.client.create_custom_metadata_def(&def).await {
            Ok(created) => {
                info!(name = %created.name, "Created DaaP custom metadata structure");
                let field = ScoreField::from_def(&created)?;
                self.create_badge(&field).await;
                Ok(field)
            }
            Err(CatalogError::Conflict(_)) => {
                // Created concurrently by another invocation.
                let existing = self
                    .client
                    .get_custom_metadata_def(CM_DAAP)
                    .await?
                    .ok_or_else(|| {
                        error!("Unable to look up DaaP custom metadata, even though it should already exist");
                        ReactorError::Api(CatalogError::NotFound(CM_DAAP.to_string()))
                    })?;
                ScoreField::from_def(&existing)
            }
            Err(e) => {
                error!(error = %e, "Unable to create DaaP custom metadata structure");
                Err(e.into())
            }
        }
    }

    /// Colour badge over the score. Failure is logged and otherwise ignored.
    async fn create_badge(&self, field: &ScoreField) {
        let badge = BadgeDef::creator(CM_ATTR_SCORE, &field.set_id, &field.attribute_id)
            .described(BADGE_DESCRIPTION)
            .condition(BadgeComparison::Gte, "75", BadgeColor::Green)
            .condition(BadgeComparison::Lt, "75", BadgeColor::Yellow)
            .condition(BadgeComparison::Lte, "25", BadgeColor::Red);
        match self.client.create_badge(&badge).await {
            Ok(_) => info!(badge = %badge.qualified_name(), "Created DaaP completeness score badge"),
            Err(e) => error!(error = %e, "Unable to create badge over the DaaP score"),
        }
    }
}

#[async_trait]
impl EventHandler for ScoreCalculator {
    fn name(&self) -> &'static str {
        "scorer"
    }

    async fn handle(&self, event: &CatalogEvent, _picked_up_at: Instant) -> Result<HandlerOutcome> {
        let snapshot = require_snapshot(event)?;
        let field = self.ensure_definition().await?;

        let score_attribute = field.projection();
        let mut attributes: Vec<&str> = SCORED_ATTRIBUTES.to_vec();
        attributes.push(&score_attribute);

        let asset = self
            .resolver
            .resolve_view(snapshot, &attributes, true, true)
            .await?
            .ok_or_else(|| {
                ReactorError::not_found(format!(
                    "{} {}",
                    snapshot.type_name,
                    snapshot.qualified_name().unwrap_or_default()
                ))
            })?;

        let score = compute_score(&asset);
        if field.stored(&asset) == Some(score) {
            info!(
                qualified_name = %asset.qualified_name(),
                score,
                "Score unchanged - no update needed"
            );
            return Ok(HandlerOutcome::Unchanged);
        }

        let mut update = AssetUpdate::trim_to_required(&asset);
        field.write(&mut update, score);
        info!(qualified_name = %asset.qualified_name(), score, "Writing DaaP score");
        self.applier.apply(&update).await?;
        Ok(HandlerOutcome::Updated)
    }
}
