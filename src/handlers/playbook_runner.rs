//! Runs every playbook against the asset named by an event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use catalog_client::CatalogClient;
use catalog_core::CatalogEvent;
use tokio::sync::watch;
use tracing::info;

use super::{EventHandler, HandlerOutcome};
use crate::change::{ChangeDetector, UpdateApplier};
use crate::envelope::require_snapshot;
use crate::error::{ReactorError, Result};
use crate::playbooks::{PlaybookLoader, RuleEngine};
use crate::resolver::AssetResolver;

pub struct PlaybookRunner {
    resolver: AssetResolver,
    loader: PlaybookLoader,
    engine: RuleEngine,
    applier: UpdateApplier,
}

impl PlaybookRunner {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        consistency_budget: Duration,
        playbook_page_size: usize,
    ) -> Self {
        Self {
            resolver: AssetResolver::new(client.clone()),
            loader: PlaybookLoader::new(client.clone(), playbook_page_size),
            engine: RuleEngine::new(client.clone(), consistency_budget),
            applier: UpdateApplier::new(client),
        }
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.engine = self.engine.with_shutdown(shutdown);
        self
    }
}

#[async_trait]
impl EventHandler for PlaybookRunner {
    fn name(&self) -> &'static str {
        "playbooks"
    }

    async fn handle(&self, event: &CatalogEvent, picked_up_at: Instant) -> Result<HandlerOutcome> {
        let snapshot = require_snapshot(event)?;
        let original = self
            .resolver
            .resolve_full(&snapshot.guid)
            .await?
            .ok_or_else(|| ReactorError::not_found(snapshot.guid.clone()))?;

        let playbooks = self.loader.load().await?;
        let output = self.engine.apply(&original, &playbooks, picked_up_at).await?;

        if !ChangeDetector::has_changes(&original, &output.full) {
            info!(
                qualified_name = %original.qualified_name(),
                matched = output.matched_rules.len(),
                "No changes to the asset after running playbooks"
            );
            return Ok(HandlerOutcome::Unchanged);
        }

        let changed: Vec<_> = ChangeDetector::changed_attributes(&original, &output.full).collect();
        info!(
            qualified_name = %original.qualified_name(),
            rules = ?output.matched_rules,
            ?changed,
            "Playbooks changed the asset"
        );
        self.applier.apply(&output.trimmed).await?;
        Ok(HandlerOutcome::Updated)
    }
}
