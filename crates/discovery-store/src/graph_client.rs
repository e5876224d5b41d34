//! Transport to the backing graph API.
//!
//! A signed GraphQL-style HTTP surface. Every request carries the
//! `requester: discovery-process` header the spec calls out (§6) so the
//! graph store's own access logs can attribute traffic to this process.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::paginator::AdaptivePaginator;

const DEFAULT_RESOURCE_PAGE_SIZE: usize = 1000;
const DEFAULT_RELATIONSHIP_PAGE_SIZE: usize = 2500;

/// A resource as read back from the graph store — already projected to the
/// shape the delta engine diffs against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResource {
    pub id: String,
    pub label: String,
    pub md5_hash: Option<String>,
    pub properties: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRelationship {
    pub source: String,
    pub label: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceWrite {
    pub id: String,
    pub label: String,
    pub properties: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipWrite {
    pub source: String,
    pub label: String,
    pub target: String,
}

pub struct GraphStoreClient {
    http: reqwest::Client,
    endpoint: String,
    resource_page_size: usize,
    relationship_page_size: usize,
}

impl GraphStoreClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            resource_page_size: DEFAULT_RESOURCE_PAGE_SIZE,
            relationship_page_size: DEFAULT_RELATIONSHIP_PAGE_SIZE,
        }
    }

    async fn post(&self, operation: &str, body: Value) -> Result<Value, StoreError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("requester", "discovery-process")
            .json(&body)
            .send()
            .await?;
        let value: Value = resp.json().await?;
        if let Some(message) = value.get("errorMessage").and_then(Value::as_str) {
            return Err(StoreError::classify(message));
        }
        value
            .get("data")
            .cloned()
            .ok_or_else(|| StoreError::GraphQlError(format!("{operation}: response carried no data field")))
    }

    /// Paged read of every stored resource, projected to
    /// `{id, label, md5Hash, properties}` with nil properties rejected.
    pub async fn read_all_resources(&self, total_hint: usize) -> Result<Vec<StoredResource>, StoreError> {
        let paginator = AdaptivePaginator::new(total_hint, self.resource_page_size);
        paginator
            .collect_all(|window| async move {
                let data = self
                    .post(
                        "getResources",
                        serde_json::json!({
                            "query": "getResources",
                            "start": window.start,
                            "end": window.end,
                        }),
                    )
                    .await?;
                let rows: Vec<StoredResource> = serde_json::from_value(
                    data.get("resources").cloned().unwrap_or(Value::Array(vec![])),
                )?;
                Ok(rows
                    .into_iter()
                    .filter(|r| !r.properties.is_null())
                    .collect())
            })
            .await
    }

    pub async fn read_all_relationships(&self, total_hint: usize) -> Result<Vec<StoredRelationship>, StoreError> {
        let paginator = AdaptivePaginator::new(total_hint, self.relationship_page_size);
        paginator
            .collect_all(|window| async move {
                let data = self
                    .post(
                        "getRelationships",
                        serde_json::json!({
                            "query": "getRelationships",
                            "start": window.start,
                            "end": window.end,
                        }),
                    )
                    .await?;
                let rows: Vec<StoredRelationship> = serde_json::from_value(
                    data.get("relationships").cloned().unwrap_or(Value::Array(vec![])),
                )?;
                Ok(rows)
            })
            .await
    }

    pub async fn store_resources(&self, batch: &[ResourceWrite]) -> Result<(), StoreError> {
        self.post("addResources", serde_json::json!({ "resources": batch })).await?;
        Ok(())
    }

    pub async fn update_resources(&self, batch: &[ResourceWrite]) -> Result<(), StoreError> {
        self.post("updateResources", serde_json::json!({ "resources": batch })).await?;
        Ok(())
    }

    pub async fn delete_resources(&self, ids: &[String]) -> Result<(), StoreError> {
        self.post("deleteResources", serde_json::json!({ "ids": ids })).await?;
        Ok(())
    }

    pub async fn store_relationships(&self, batch: &[RelationshipWrite]) -> Result<(), StoreError> {
        self.post(
            "addRelationships",
            serde_json::json!({ "relationships": batch }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_relationships(&self, batch: &[RelationshipWrite]) -> Result<(), StoreError> {
        self.post(
            "deleteRelationships",
            serde_json::json!({ "relationships": batch }),
        )
        .await?;
        Ok(())
    }

    /// Bulk add/update/delete account records, keyed by account id.
    pub async fn upsert_accounts(&self, accounts: &HashMap<String, Value>) -> Result<(), StoreError> {
        self.post("putAccounts", serde_json::json!({ "accounts": accounts })).await?;
        Ok(())
    }

    /// Reads every account record the store holds. Unpaged — the account
    /// list is orders of magnitude smaller than the resource/relationship
    /// graph, so a single round trip is enough.
    pub async fn read_all_accounts(&self) -> Result<HashMap<String, Value>, StoreError> {
        let data = self.post("getAccounts", serde_json::json!({ "query": "getAccounts" })).await?;
        let accounts = data.get("accounts").cloned().unwrap_or(Value::Object(serde_json::Map::new()));
        Ok(serde_json::from_value(accounts)?)
    }
}
