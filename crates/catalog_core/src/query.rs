//! Index search model.
//!
//! Queries are kept as the search index's JSON DSL so that rule filters
//! authored in the catalog can be combined with locally built clauses
//! without a lossy round trip through a typed AST.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::asset::{Asset, AssetRef};

pub const FIELD_GUID: &str = "__guid";
pub const FIELD_STATE: &str = "__state";
pub const FIELD_TYPE_NAME: &str = "__typeName.keyword";
pub const FIELD_QUALIFIED_NAME: &str = "qualifiedName";

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Query(Value);

impl Query {
    pub fn raw(value: Value) -> Self {
        Self(value)
    }

    pub fn term(field: &str, value: impl Into<Value>) -> Self {
        Self(json!({ "term": { field: { "value": value.into() } } }))
    }

    pub fn active() -> Self {
        Self::term(FIELD_STATE, "ACTIVE")
    }

    pub fn of_type(type_name: &str) -> Self {
        Self::term(FIELD_TYPE_NAME, type_name)
    }

    pub fn qualified_name(qualified_name: &str) -> Self {
        Self::term(FIELD_QUALIFIED_NAME, qualified_name)
    }

    pub fn guid(guid: &str) -> Self {
        Self::term(FIELD_GUID, guid)
    }

    /// Conjunction of every clause.
    pub fn all(clauses: impl IntoIterator<Item = Query>) -> Self {
        let must: Vec<Value> = clauses.into_iter().map(|q| q.0).collect();
        Self(json!({ "bool": { "must": must } }))
    }

    pub fn and(self, other: Query) -> Self {
        Self::all([self, other])
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    pub attributes: BTreeSet<String>,
    pub relation_attributes: BTreeSet<String>,
    pub include_meanings: bool,
    pub include_classifications: bool,
    pub from: usize,
    pub size: usize,
}

impl SearchRequest {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            attributes: BTreeSet::new(),
            relation_attributes: BTreeSet::new(),
            include_meanings: false,
            include_classifications: false,
            from: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .extend(attributes.into_iter().map(Into::into));
        self
    }

    pub fn attribute(mut self, attribute: &str) -> Self {
        self.attributes.insert(attribute.to_string());
        self
    }

    pub fn relation_attribute(mut self, attribute: &str) -> Self {
        self.relation_attributes.insert(attribute.to_string());
        self
    }

    pub fn include_meanings(mut self, include: bool) -> Self {
        self.include_meanings = include;
        self
    }

    pub fn include_classifications(mut self, include: bool) -> Self {
        self.include_classifications = include;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Request body for the index search endpoint.
    pub fn to_json(&self) -> Value {
        json!({
            "dsl": {
                "from": self.from,
                "size": self.size,
                "query": self.query.as_json(),
                "track_total_hits": true,
            },
            "attributes": self.attributes,
            "relationAttributes": self.relation_attributes,
            "excludeMeanings": !self.include_meanings,
            "excludeClassifications": !self.include_classifications,
            "suppressLogs": true,
            "showSearchScore": false,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub entities: Vec<Asset>,
    #[serde(default)]
    pub approximate_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    /// Keyed by mutation kind: `CREATE`, `UPDATE`, `PARTIAL_UPDATE`, `DELETE`.
    #[serde(default)]
    pub mutated_entities: BTreeMap<String, Vec<AssetRef>>,
}

impl MutationResponse {
    pub fn updated(guids: impl IntoIterator<Item = String>) -> Self {
        Self::of_kind("UPDATE", guids)
    }

    pub fn created(guids: impl IntoIterator<Item = String>) -> Self {
        Self::of_kind("CREATE", guids)
    }

    fn of_kind(kind: &str, guids: impl IntoIterator<Item = String>) -> Self {
        let refs = guids
            .into_iter()
            .map(|guid| AssetRef {
                guid: Some(guid),
                type_name: None,
                display_text: None,
            })
            .collect();
        let mut mutated_entities = BTreeMap::new();
        mutated_entities.insert(kind.to_string(), refs);
        Self { mutated_entities }
    }

    pub fn updated_guids(&self) -> impl Iterator<Item = &str> {
        ["UPDATE", "PARTIAL_UPDATE"]
            .into_iter()
            .filter_map(|kind| self.mutated_entities.get(kind))
            .flatten()
            .filter_map(|r| r.guid.as_deref())
    }

    pub fn was_updated(&self, guid: &str) -> bool {
        self.updated_guids().any(|g| g == guid)
    }
}
