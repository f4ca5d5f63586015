//! Rule catalog loading.
//!
//! Playbooks are fetched fresh on every invocation. A playbook whose rules
//! cannot be parsed is logged and skipped; it never fails the whole load.

use std::sync::Arc;

use catalog_client::CatalogClient;
use catalog_core::playbook::RULES_PARAMETER;
use catalog_core::{Playbook, PlaybookRule, WorkflowDefinition};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::Result;

#[derive(Clone)]
pub struct PlaybookLoader {
    client: Arc<dyn CatalogClient>,
    page_size: usize,
}

impl PlaybookLoader {
    pub fn new(client: Arc<dyn CatalogClient>, page_size: usize) -> Self {
        Self { client, page_size }
    }

    /// Playbooks in the order the catalog returned them.
    ///
    /// A later definition with an already-seen name replaces the earlier
    /// one's rules in place.
    pub async fn load(&self) -> Result<Vec<Playbook>> {
        let definitions = self.client.list_playbooks(self.page_size).await?;
        let mut playbooks: Vec<Playbook> = Vec::with_capacity(definitions.len());
        for definition in &definitions {
            let Some(playbook) = parse_definition(definition) else {
                continue;
            };
            match playbooks.iter_mut().find(|p| p.name == playbook.name) {
                Some(existing) => existing.rules = playbook.rules,
                None => playbooks.push(playbook),
            }
        }
        debug!(count = playbooks.len(), "loaded playbooks");
        Ok(playbooks)
    }
}

fn parse_definition(definition: &WorkflowDefinition) -> Option<Playbook> {
    let Some(name) = definition.playbook_name() else {
        error!("Playbook definition has no name - skipping");
        return None;
    };
    let Some(raw) = definition.parameter(RULES_PARAMETER) else {
        error!(playbook = name, "Playbook has no rules parameter - skipping");
        return None;
    };
    match parse_rules(raw) {
        Ok(rules) => Some(Playbook {
            name: name.to_string(),
            rules,
        }),
        Err(e) => {
            error!(playbook = name, error = %e, "Unable to parse rules for playbook - skipping");
            None
        }
    }
}

/// Rules arrive as a JSON string; an already-structured array is accepted too.
fn parse_rules(raw: &Value) -> serde_json::Result<Vec<PlaybookRule>> {
    match raw {
        Value::String(encoded) => serde_json::from_str(encoded),
        other => serde_json::from_value(other.clone()),
    }
}
