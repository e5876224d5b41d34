//! Transport to the full-text search index.
//!
//! `index`, `update`, and `deleteIndexed` each return the subset of the
//! batch that was **not** accepted — `unprocessedResources` — rather than
//! failing the whole call. The dual-store coordinator (`dual_write`) uses
//! that subset to decide what to forward to the graph store.

use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::graph_client::ResourceWrite;

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub unprocessed_resources: Vec<String>,
}

#[derive(Serialize)]
struct IndexRequest<'a> {
    resources: &'a [ResourceWrite],
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
}

pub struct SearchIndexClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SearchIndexClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn post(&self, operation: &str, body: Value) -> Result<Vec<String>, StoreError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("requester", "discovery-process")
            .header("x-search-operation", operation)
            .json(&body)
            .send()
            .await?;
        let value: Value = resp.json().await?;
        let unprocessed = value
            .get("unprocessedResources")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(unprocessed)
    }

    pub async fn index(&self, batch: &[ResourceWrite]) -> Result<BatchResult, StoreError> {
        let unprocessed_resources = self
            .post("index", serde_json::to_value(IndexRequest { resources: batch })?)
            .await?;
        Ok(BatchResult { unprocessed_resources })
    }

    pub async fn update(&self, batch: &[ResourceWrite]) -> Result<BatchResult, StoreError> {
        let unprocessed_resources = self
            .post("update", serde_json::to_value(IndexRequest { resources: batch })?)
            .await?;
        Ok(BatchResult { unprocessed_resources })
    }

    pub async fn delete_indexed(&self, ids: &[String]) -> Result<BatchResult, StoreError> {
        let unprocessed_resources = self
            .post("deleteIndexed", serde_json::to_value(DeleteRequest { ids })?)
            .await?;
        Ok(BatchResult { unprocessed_resources })
    }
}
