//! In-process catalog.
//!
//! Keeps an authoritative store keyed by guid and a separate search index.
//! With auto-refresh on (the default) every write is mirrored into the
//! index immediately; with it off the index only catches up on
//! [`InMemoryCatalog::refresh_index`], which is how tests reproduce the
//! lag between a write and its visibility in search.
//!
//! Custom-metadata definitions get internal names (`cm0000`, `cm0000a00`,
//! ...) on registration, and updates keyed by anything else are rejected,
//! as a live catalog rejects display names.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use catalog_core::{
    Asset, AssetUpdate, BadgeDef, CatalogError, CustomMetadataDef, MutationResponse,
    SearchRequest, SearchResponse, WorkflowDefinition,
};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{CatalogClient, Result};

/// Attributes always returned by a search, whatever the projection.
const ALWAYS_PROJECTED: &[&str] = &["qualifiedName", "name"];

#[derive(Default)]
struct State {
    store: BTreeMap<String, Asset>,
    index: Vec<Asset>,
    manual_refresh: bool,
    playbooks: Vec<WorkflowDefinition>,
    typedefs: Vec<CustomMetadataDef>,
    badges: Vec<BadgeDef>,
    updates: Vec<AssetUpdate>,
    searches: Vec<SearchRequest>,
    failure_status: Option<u16>,
}

impl State {
    fn index_from_store(&mut self, guid: &str) {
        self.index.retain(|a| a.guid != guid);
        if let Some(asset) = self.store.get(guid) {
            self.index.push(asset.clone());
        }
    }

    /// Store `def`, assigning internal names where it has none.
    fn register_typedef(&mut self, def: CustomMetadataDef) -> CustomMetadataDef {
        let mut registered = def;
        if registered.name.is_empty() {
            registered.name = format!("cm{:04}", self.typedefs.len());
        }
        for (i, attribute) in registered.attribute_defs.iter_mut().enumerate() {
            if attribute.name.is_empty() {
                attribute.name = format!("{}a{i:02}", registered.name);
            }
        }
        self.typedefs.push(registered.clone());
        registered
    }

    /// Reject custom metadata not keyed by registered internal names.
    fn check_custom_metadata(&self, update: &AssetUpdate) -> Result<()> {
        for (set, values) in &update.custom_metadata {
            let Some(def) = self.typedefs.iter().find(|d| &d.name == set) else {
                return Err(CatalogError::Api {
                    status: 400,
                    message: format!("unknown custom metadata set '{set}'"),
                });
            };
            if let Some(attribute) = values
                .keys()
                .find(|key| !def.attribute_defs.iter().any(|a| &a.name == *key))
            {
                return Err(CatalogError::Api {
                    status: 400,
                    message: format!("unknown attribute '{attribute}' in custom metadata '{set}'"),
                });
            }
        }
        Ok(())
    }

    fn fail_if_configured(&self) -> Result<()> {
        match self.failure_status {
            Some(status) => Err(CatalogError::from_status(status, "injected failure")),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    state: Mutex<State>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, asset: Asset) -> Self {
        let state = self.state.get_mut();
        state.store.insert(asset.guid.clone(), asset.clone());
        state.index_from_store(&asset.guid);
        self
    }

    pub fn with_playbook(mut self, definition: WorkflowDefinition) -> Self {
        self.state.get_mut().playbooks.push(definition);
        self
    }

    pub fn with_custom_metadata_def(mut self, def: CustomMetadataDef) -> Self {
        self.state.get_mut().register_typedef(def);
        self
    }

    /// Stop mirroring writes into the search index until `refresh_index`.
    pub fn with_manual_index_refresh(mut self) -> Self {
        self.state.get_mut().manual_refresh = true;
        self
    }

    pub async fn insert(&self, asset: Asset) {
        let mut state = self.state.lock().await;
        let guid = asset.guid.clone();
        state.store.insert(guid.clone(), asset);
        if !state.manual_refresh {
            state.index_from_store(&guid);
        }
    }

    /// Add an index entry with no counterpart in the store, e.g. the stale
    /// copy left behind by a rename.
    pub async fn push_index_entry(&self, asset: Asset) {
        self.state.lock().await.index.push(asset);
    }

    pub async fn refresh_index(&self) {
        let mut state = self.state.lock().await;
        state.index = state.store.values().cloned().collect();
    }

    /// Make every subsequent call fail with this HTTP status.
    pub async fn fail_with_status(&self, status: Option<u16>) {
        self.state.lock().await.failure_status = status;
    }

    pub async fn asset(&self, guid: &str) -> Option<Asset> {
        self.state.lock().await.store.get(guid).cloned()
    }

    pub async fn updates(&self) -> Vec<AssetUpdate> {
        self.state.lock().await.updates.clone()
    }

    pub async fn searches(&self) -> Vec<SearchRequest> {
        self.state.lock().await.searches.clone()
    }

    pub async fn custom_metadata_defs(&self) -> Vec<CustomMetadataDef> {
        self.state.lock().await.typedefs.clone()
    }

    pub async fn badges(&self) -> Vec<BadgeDef> {
        self.state.lock().await.badges.clone()
    }

    /// A stored custom-metadata value, looked up by display names.
    pub async fn custom_metadata_value(
        &self,
        guid: &str,
        set: &str,
        attribute: &str,
    ) -> Option<Value> {
        let state = self.state.lock().await;
        let def = state.typedefs.iter().find(|d| d.display_name == set)?;
        let (set_id, attribute_id) = def.internal_names(attribute)?;
        state
            .store
            .get(guid)?
            .custom_metadata_value(set_id, attribute_id)
            .cloned()
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn get_asset(&self, guid: &str) -> Result<Option<Asset>> {
        let state = self.state.lock().await;
        state.fail_if_configured()?;
        Ok(state.store.get(guid).cloned())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let mut state = self.state.lock().await;
        state.fail_if_configured()?;
        state.searches.push(request.clone());

        let query = request.query.as_json();
        let mut hits = Vec::new();
        for asset in &state.index {
            let document = serde_json::to_value(asset)?;
            if matches(query, &document) {
                hits.push(project(asset, request)?);
            }
        }
        let approximate_count = hits.len() as u64;
        let entities = hits
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .collect();
        debug!(approximate_count, "in-memory search");
        Ok(SearchResponse {
            entities,
            approximate_count,
        })
    }

    async fn update_asset(&self, update: &AssetUpdate) -> Result<MutationResponse> {
        let mut state = self.state.lock().await;
        state.fail_if_configured()?;
        state.check_custom_metadata(update)?;
        let asset = state
            .store
            .get_mut(&update.guid)
            .ok_or_else(|| CatalogError::NotFound(update.guid.clone()))?;
        update.apply_to(asset);
        state.updates.push(update.clone());
        if !state.manual_refresh {
            state.index_from_store(&update.guid);
        }
        Ok(MutationResponse::updated([update.guid.clone()]))
    }

    async fn get_custom_metadata_def(
        &self,
        display_name: &str,
    ) -> Result<Option<CustomMetadataDef>> {
        let state = self.state.lock().await;
        state.fail_if_configured()?;
        Ok(state
            .typedefs
            .iter()
            .find(|d| d.display_name == display_name)
            .cloned())
    }

    async fn create_custom_metadata_def(
        &self,
        def: &CustomMetadataDef,
    ) -> Result<CustomMetadataDef> {
        let mut state = self.state.lock().await;
        state.fail_if_configured()?;
        if state
            .typedefs
            .iter()
            .any(|d| d.display_name == def.display_name)
        {
            return Err(CatalogError::Conflict(format!(
                "custom metadata '{}' already exists",
                def.display_name
            )));
        }
        let created = state.register_typedef(def.clone());
        Ok(created)
    }

    async fn create_badge(&self, badge: &BadgeDef) -> Result<MutationResponse> {
        let mut state = self.state.lock().await;
        state.fail_if_configured()?;
        let known = state.typedefs.iter().any(|def| {
            def.attribute_defs
                .iter()
                .any(|a| format!("{}.{}", def.name, a.name) == badge.metadata_attribute)
        });
        if !known {
            return Err(CatalogError::Api {
                status: 400,
                message: format!("badge over unknown attribute '{}'", badge.metadata_attribute),
            });
        }
        state
            .badges
            .retain(|b| b.metadata_attribute != badge.metadata_attribute);
        state.badges.push(badge.clone());
        Ok(MutationResponse::created([badge.qualified_name()]))
    }

    async fn list_playbooks(&self, max: usize) -> Result<Vec<WorkflowDefinition>> {
        let state = self.state.lock().await;
        state.fail_if_configured()?;
        Ok(state.playbooks.iter().take(max).cloned().collect())
    }
}

// ── Query evaluation ──────────────────────────────────────────

/// Evaluate the subset of the index DSL that rules and resolvers use:
/// `bool` (`must`/`filter`/`should`/`must_not`), `term`, `terms`,
/// `prefix`, `exists` and `match_all`.
fn matches(query: &Value, document: &Value) -> bool {
    let Some((kind, body)) = query.as_object().and_then(|o| o.iter().next()) else {
        return false;
    };
    match kind.as_str() {
        "match_all" => true,
        "bool" => {
            let all = |key: &str| {
                clauses(body, key)
                    .iter()
                    .all(|clause| matches(clause, document))
            };
            let should = clauses(body, "should");
            let any_should =
                should.is_empty() || should.iter().any(|clause| matches(clause, document));
            let none_excluded = !clauses(body, "must_not")
                .iter()
                .any(|clause| matches(clause, document));
            all("must") && all("filter") && any_should && none_excluded
        }
        "term" => single_field(body).is_some_and(|(field, expected)| {
            let expected = expected.get("value").unwrap_or(expected);
            field_values(document, field).contains(expected)
        }),
        "terms" => single_field(body).is_some_and(|(field, expected)| {
            let values = field_values(document, field);
            expected
                .as_array()
                .is_some_and(|options| options.iter().any(|o| values.contains(o)))
        }),
        "prefix" => single_field(body).is_some_and(|(field, expected)| {
            let prefix = expected
                .get("value")
                .unwrap_or(expected)
                .as_str()
                .unwrap_or_default();
            field_values(document, field)
                .iter()
                .any(|v| v.as_str().is_some_and(|s| s.starts_with(prefix)))
        }),
        "exists" => body
            .get("field")
            .and_then(Value::as_str)
            .is_some_and(|field| !field_values(document, field).is_empty()),
        other => {
            debug!(clause = other, "unsupported query clause treated as no match");
            false
        }
    }
}

fn clauses(body: &Value, key: &str) -> Vec<Value> {
    match body.get(key) {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn single_field(body: &Value) -> Option<(&str, &Value)> {
    body.as_object()?
        .iter()
        .next()
        .map(|(field, value)| (field.as_str(), value))
}

/// Values of `field` on an entity document, flattened.
fn field_values(document: &Value, field: &str) -> Vec<Value> {
    let field = field
        .trim_end_matches(".keyword")
        .trim_end_matches(".text");
    let raw = match field {
        "__guid" => document.get("guid").cloned(),
        "__typeName" => document.get("typeName").cloned(),
        "__state" => Some(
            document
                .get("status")
                .cloned()
                .unwrap_or_else(|| Value::String("ACTIVE".to_string())),
        ),
        "__traitNames" | "__classificationNames" => document.get("classifications").map(|c| {
            Value::Array(
                c.as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|item| item.get("typeName").cloned())
                    .collect(),
            )
        }),
        other => document.get("attributes").and_then(|a| a.get(other)).cloned(),
    };
    match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(value) => vec![value],
    }
}

/// Restrict an asset to what the search asked to see.
fn project(asset: &Asset, request: &SearchRequest) -> Result<Asset> {
    let requested: BTreeSet<&str> = request
        .attributes
        .iter()
        .map(String::as_str)
        .chain(ALWAYS_PROJECTED.iter().copied())
        .collect();

    let mut projected = asset.clone();
    let attributes = serde_json::to_value(&asset.attributes)?;
    let kept: Map<String, Value> = attributes
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(key, _)| {
            requested.contains(key.as_str())
                || (key.as_str() == "meanings" && request.include_meanings)
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    projected.attributes = serde_json::from_value(Value::Object(kept))?;

    if !request.include_classifications {
        projected.classifications = None;
    }
    projected.custom_metadata = asset.custom_metadata.as_ref().and_then(|sets| {
        let visible: BTreeMap<_, _> = sets
            .iter()
            .filter(|(set, _)| {
                let prefix = format!("{set}.");
                requested.iter().any(|r| r.starts_with(&prefix))
            })
            .map(|(set, values)| (set.clone(), values.clone()))
            .collect();
        (!visible.is_empty()).then_some(visible)
    });
    Ok(projected)
}
