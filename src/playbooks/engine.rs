//! Rule matching and mutation.
//!
//! For each playbook in load order and each rule in declared order, the
//! rule's filter is ANDed with the triggering asset's guid and run against
//! the search index. Any hit means the rule applies, and its actions are
//! applied in order to both working copies.
//!
//! The index may not yet reflect the write that caused the event, so
//! matching first waits out whatever is left of a fixed consistency budget
//! measured from when the event was picked up.

use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog_client::CatalogClient;
use catalog_core::{
    ActionType, Asset, AssetUpdate, CertificateStatus, OwnersValue, Patch, Playbook,
    PlaybookActionSchema, PlaybookRule, Query, SearchRequest,
};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{info, warn};

use super::owners::plan_owner_change;
use super::working_copy::{FieldChange, WorkingCopies};
use crate::error::{ReactorError, Result};

/// Result of walking every playbook against one asset.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Complete asset with every matching action applied.
    pub full: Asset,
    /// Identity plus only the attributes matching actions touched.
    pub trimmed: AssetUpdate,
    /// `playbook::rule` for each rule that matched.
    pub matched_rules: Vec<String>,
}

pub struct RuleEngine {
    client: Arc<dyn CatalogClient>,
    consistency_budget: Duration,
    shutdown: Option<watch::Receiver<bool>>,
}

impl RuleEngine {
    pub fn new(client: Arc<dyn CatalogClient>, consistency_budget: Duration) -> Self {
        Self {
            client,
            consistency_budget,
            shutdown: None,
        }
    }

    /// Let a shutdown signal cut the consistency wait short.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub async fn apply(
        &self,
        original: &Asset,
        playbooks: &[Playbook],
        picked_up_at: Instant,
    ) -> Result<EngineOutput> {
        let mut copies = WorkingCopies::new(original);
        let mut matched_rules = Vec::new();

        if playbooks.iter().any(|p| !p.rules.is_empty()) {
            if let Err(e) = self.wait_for_index(picked_up_at).await {
                warn!(error = %e, "Proceeding with rule matching before the index caught up");
            }
        }

        for playbook in playbooks {
            for rule in &playbook.rules {
                if !self.rule_matches(original, &playbook.name, rule).await? {
                    info!(
                        guid = %original.guid,
                        playbook = %playbook.name,
                        rule = %rule.name,
                        "Asset did not match rule criteria - skipping its actions"
                    );
                    continue;
                }
                matched_rules.push(format!("{}::{}", playbook.name, rule.name));
                for action in &rule.actions {
                    match &action.action_type {
                        ActionType::MetadataUpdate => {
                            info!(
                                playbook = %playbook.name,
                                rule = %rule.name,
                                qualified_name = %original.qualified_name(),
                                "Applying metadata update"
                            );
                            apply_metadata_update(&mut copies, &action.actions_schema);
                        }
                        other => warn!(
                            action_type = %other,
                            playbook = %playbook.name,
                            rule = %rule.name,
                            "Unhandled playbook action type - skipping"
                        ),
                    }
                }
            }
        }

        let (full, trimmed) = copies.into_parts();
        Ok(EngineOutput {
            full,
            trimmed,
            matched_rules,
        })
    }

    /// Sleep for whatever is left of the consistency budget.
    async fn wait_for_index(&self, picked_up_at: Instant) -> Result<()> {
        let remaining = self
            .consistency_budget
            .saturating_sub(picked_up_at.elapsed());
        if remaining.is_zero() {
            return Ok(());
        }

        let Some(shutdown) = &self.shutdown else {
            tokio::time::sleep(remaining).await;
            return Ok(());
        };
        let mut shutdown = shutdown.clone();
        let started = Instant::now();
        let interrupted = || ReactorError::ConsistencyWaitInterrupted {
            waited_ms: started.elapsed().as_millis() as u64,
        };
        if *shutdown.borrow() {
            return Err(interrupted());
        }
        tokio::select! {
            _ = tokio::time::sleep(remaining) => Ok(()),
            Ok(()) = shutdown.changed() => Err(interrupted()),
        }
    }

    async fn rule_matches(
        &self,
        original: &Asset,
        playbook: &str,
        rule: &PlaybookRule,
    ) -> Result<bool> {
        let Some(filter) = rule.match_query() else {
            warn!(playbook, rule = %rule.name, "Rule has no match query - skipping");
            return Ok(false);
        };
        let query = Query::raw(filter.clone()).and(Query::guid(&original.guid));
        let response = self.client.search(&SearchRequest::new(query)).await?;
        if response.entities.len() > 1 {
            warn!(
                guid = %original.guid,
                count = response.entities.len(),
                "Rule match returned duplicate hits for one guid, using the first"
            );
        }
        Ok(!response.entities.is_empty())
    }
}

/// Dispatch one `METADATA_UPDATE` action by operand.
fn apply_metadata_update(copies: &mut WorkingCopies, schema: &PlaybookActionSchema) {
    match schema.operand.as_str() {
        "description" => {
            if let Some(patch) = text_patch(&schema.value) {
                copies.apply(FieldChange::Description(patch));
            } else {
                warn!(operand = "description", value = %schema.value, "Non-text value - skipping");
            }
        }
        "userDescription" => {
            if let Some(patch) = text_patch(&schema.value) {
                copies.apply(FieldChange::UserDescription(patch));
            } else {
                warn!(operand = "userDescription", value = %schema.value, "Non-text value - skipping");
            }
        }
        "certificateStatus" => match certificate_patch(&schema.value) {
            Some(patch) => copies.apply(FieldChange::CertificateStatus(patch)),
            None => warn!(value = %schema.value, "Unknown certificate status - skipping"),
        },
        "owners" => {
            let Some(requested) = OwnersValue::from_value(&schema.value) else {
                warn!(value = %schema.value, "Owners value is not an object - skipping");
                return;
            };
            let attrs = &copies.full().attributes;
            match plan_owner_change(
                attrs.owner_users.as_ref(),
                attrs.owner_groups.as_ref(),
                &schema.operator,
                &requested,
            ) {
                Some(change) => copies.apply(FieldChange::Owners(change)),
                None => warn!(operator = %schema.operator, "Unknown operation for owners - skipping"),
            }
        }
        other => warn!(operand = other, "Unhandled attribute - skipping"),
    }
}

fn text_patch(value: &Value) -> Option<Patch<String>> {
    match value {
        Value::Null => Some(Patch::Clear),
        Value::String(text) => Some(Patch::Set(text.clone())),
        _ => None,
    }
}

fn certificate_patch(value: &Value) -> Option<Patch<CertificateStatus>> {
    match value {
        Value::Null => Some(Patch::Clear),
        Value::String(raw) => raw.parse().ok().map(Patch::Set),
        _ => None,
    }
}
