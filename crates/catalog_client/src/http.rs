//! HTTP implementation of [`CatalogClient`].

use std::time::Duration;

use async_trait::async_trait;
use catalog_core::{
    Asset, AssetUpdate, BadgeDef, CatalogError, CustomMetadataDef, MutationResponse,
    SearchRequest, SearchResponse, WorkflowDefinition,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{CatalogClient, Result};

const ENTITY_BY_GUID: &str = "/api/meta/entity/guid";
const ENTITY_BULK: &str = "/api/meta/entity/bulk";
const INDEX_SEARCH: &str = "/api/meta/search/indexsearch";
const TYPEDEFS: &str = "/api/meta/types/typedefs";
const WORKFLOW_SEARCH: &str = "/api/service/workflows/indexsearch";

/// Workflow-name prefix under which playbooks are stored.
const PLAYBOOK_PREFIX: &str = "asset-playbook";

#[derive(Clone)]
pub struct HttpCatalogClient {
    base_url: String,
    api_token: String,
    client: reqwest::Client,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, api_token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::from_status(status.as_u16(), body));
        }
        response.json::<T>().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> CatalogError {
    CatalogError::Transport(err.to_string())
}

#[derive(Deserialize)]
struct EntityEnvelope {
    entity: Asset,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeDefsEnvelope {
    #[serde(default)]
    business_metadata_defs: Vec<CustomMetadataDef>,
}

#[derive(Deserialize)]
struct WorkflowHits {
    #[serde(default)]
    hits: WorkflowHitList,
}

#[derive(Deserialize, Default)]
struct WorkflowHitList {
    #[serde(default)]
    hits: Vec<WorkflowHit>,
}

#[derive(Deserialize)]
struct WorkflowHit {
    #[serde(rename = "_source")]
    source: WorkflowDefinition,
}

/// Workflow search body returning the newest `max` playbooks.
pub(crate) fn playbook_search_body(max: usize) -> Value {
    json!({
        "from": 0,
        "size": max,
        "query": {"bool": {"filter": [{
            "nested": {
                "path": "metadata",
                "query": {"prefix": {"metadata.name.keyword": {"value": PLAYBOOK_PREFIX}}}
            }
        }]}},
        "sort": [{
            "metadata.creationTimestamp": {"nested": {"path": "metadata"}, "order": "desc"}
        }]
    })
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn get_asset(&self, guid: &str) -> Result<Option<Asset>> {
        let request = self
            .client
            .get(self.url(&format!("{ENTITY_BY_GUID}/{guid}")))
            .query(&[("ignoreRelationships", "false"), ("minExtInfo", "false")]);
        match self.send::<EntityEnvelope>(request).await {
            Ok(envelope) => Ok(Some(envelope.entity)),
            Err(CatalogError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        debug!(size = request.size, "index search");
        let body = request.to_json();
        self.send(self.client.post(self.url(INDEX_SEARCH)).json(&body))
            .await
    }

    async fn update_asset(&self, update: &AssetUpdate) -> Result<MutationResponse> {
        let body = json!({ "entities": [update.to_json()] });
        self.send(
            self.client
                .post(self.url(ENTITY_BULK))
                .query(&[("replaceBusinessAttributes", "false")])
                .json(&body),
        )
        .await
    }

    async fn get_custom_metadata_def(
        &self,
        display_name: &str,
    ) -> Result<Option<CustomMetadataDef>> {
        let envelope: TypeDefsEnvelope = self
            .send(
                self.client
                    .get(self.url(TYPEDEFS))
                    .query(&[("type", "business_metadata")]),
            )
            .await?;
        Ok(envelope
            .business_metadata_defs
            .into_iter()
            .find(|d| d.display_name == display_name))
    }

    async fn create_custom_metadata_def(
        &self,
        def: &CustomMetadataDef,
    ) -> Result<CustomMetadataDef> {
        let body = json!({ "businessMetadataDefs": [def] });
        let envelope: TypeDefsEnvelope = self
            .send(self.client.post(self.url(TYPEDEFS)).json(&body))
            .await?;
        envelope
            .business_metadata_defs
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::Api {
                status: 500,
                message: format!("no definition returned for '{}'", def.display_name),
            })
    }

    async fn create_badge(&self, badge: &BadgeDef) -> Result<MutationResponse> {
        let body = json!({ "entities": [badge.to_json()] });
        self.send(self.client.post(self.url(ENTITY_BULK)).json(&body))
            .await
    }

    async fn list_playbooks(&self, max: usize) -> Result<Vec<WorkflowDefinition>> {
        let body = playbook_search_body(max);
        let hits: WorkflowHits = self
            .send(self.client.post(self.url(WORKFLOW_SEARCH)).json(&body))
            .await?;
        Ok(hits.hits.hits.into_iter().map(|h| h.source).collect())
    }
}
