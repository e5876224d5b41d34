//! Persister (§4.10): writes a `Delta` with fixed per-phase concurrency
//! and batch sizes, through the dual-store policy for resource mutations.
//! Grounded on `claria-provisioner::orchestrate::execute`'s phase-ordered
//! creates-then-modifies-then-deletes-reversed loop, generalized from a
//! sequential single-resource loop to bounded-concurrency batched phases
//! via `futures::stream::iter(..).buffer_unordered(concurrency)`.

use futures::stream::{self, StreamExt};
use serde_json::Value;

use discovery_store::dual_write;
use discovery_store::graph_client::{GraphStoreClient, RelationshipWrite, ResourceWrite};
use discovery_store::search_client::SearchIndexClient;

use crate::delta::Delta;
use crate::error::EngineError;

const DELETE_RESOURCES_CONCURRENCY: usize = 5;
const DELETE_RESOURCES_BATCH: usize = 50;
const UPDATE_RESOURCES_CONCURRENCY: usize = 10;
const UPDATE_RESOURCES_BATCH: usize = 10;
const STORE_RESOURCES_CONCURRENCY: usize = 10;
const STORE_RESOURCES_BATCH: usize = 10;
const DELETE_RELATIONSHIPS_CONCURRENCY: usize = 5;
const DELETE_RELATIONSHIPS_BATCH: usize = 50;
const STORE_RELATIONSHIPS_CONCURRENCY: usize = 10;
const STORE_RELATIONSHIPS_BATCH: usize = 20;

/// Ids that never landed in either store (`failed_stores`, covering both
/// `storeResources` and `updateResources` rejections) and ids whose
/// deletion the search index rejected (`failed_deletes`, still present in
/// both stores). The reconciliation step in `orchestrator` uses these to
/// rebuild the working set before `region_metadata` runs.
#[derive(Debug, Clone, Default)]
pub struct PersistOutcome {
    pub failed_stores: Vec<String>,
    pub failed_deletes: Vec<String>,
}

pub async fn persist(graph: &GraphStoreClient, search: &SearchIndexClient, delta: &Delta) -> Result<PersistOutcome, EngineError> {
    let mut failed_stores = Vec::new();
    let mut failed_deletes = Vec::new();

    failed_deletes.extend(delete_resources(graph, search, &delta.resource_ids_to_delete).await?);
    failed_stores.extend(update_resources(graph, search, delta).await?);
    failed_stores.extend(store_resources(graph, search, delta).await?);
    delete_relationships(graph, &delta.links_to_delete).await?;
    store_relationships(graph, &delta.links_to_add).await?;

    Ok(PersistOutcome { failed_stores, failed_deletes })
}

async fn delete_resources(graph: &GraphStoreClient, search: &SearchIndexClient, ids: &[String]) -> Result<Vec<String>, EngineError> {
    let outcomes = stream::iter(ids.chunks(DELETE_RESOURCES_BATCH))
        .map(|batch| dual_write::delete_batch(search, graph, batch))
        .buffer_unordered(DELETE_RESOURCES_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut rejected = Vec::new();
    for outcome in outcomes {
        rejected.extend(outcome?.rejected);
    }
    Ok(rejected)
}

async fn update_resources(graph: &GraphStoreClient, search: &SearchIndexClient, delta: &Delta) -> Result<Vec<String>, EngineError> {
    let writes: Vec<ResourceWrite> = delta
        .resources_to_update
        .iter()
        .map(|u| ResourceWrite {
            id: u.id.clone(),
            label: u.label.clone(),
            properties: Value::Object(u.changed_properties.clone()),
        })
        .collect();

    let outcomes = stream::iter(writes.chunks(UPDATE_RESOURCES_BATCH))
        .map(|batch| dual_write::store_batch(search, graph, batch, true))
        .buffer_unordered(UPDATE_RESOURCES_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut rejected = Vec::new();
    for outcome in outcomes {
        rejected.extend(outcome?.rejected);
    }
    Ok(rejected)
}

async fn store_resources(graph: &GraphStoreClient, search: &SearchIndexClient, delta: &Delta) -> Result<Vec<String>, EngineError> {
    let writes: Vec<ResourceWrite> = delta
        .resources_to_store
        .iter()
        .map(|r| ResourceWrite {
            id: r.id.clone(),
            label: r.label.clone(),
            properties: Value::Object(r.properties.clone()),
        })
        .collect();

    let outcomes = stream::iter(writes.chunks(STORE_RESOURCES_BATCH))
        .map(|batch| dual_write::store_batch(search, graph, batch, false))
        .buffer_unordered(STORE_RESOURCES_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut rejected = Vec::new();
    for outcome in outcomes {
        rejected.extend(outcome?.rejected);
    }
    Ok(rejected)
}

async fn delete_relationships(graph: &GraphStoreClient, links: &[discovery_core::relationship::Relationship]) -> Result<(), EngineError> {
    let writes = to_writes(links);
    stream::iter(writes.chunks(DELETE_RELATIONSHIPS_BATCH))
        .map(|batch| graph.delete_relationships(batch))
        .buffer_unordered(DELETE_RELATIONSHIPS_CONCURRENCY)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<()>, _>>()?;
    Ok(())
}

async fn store_relationships(graph: &GraphStoreClient, links: &[discovery_core::relationship::Relationship]) -> Result<(), EngineError> {
    let writes = to_writes(links);
    stream::iter(writes.chunks(STORE_RELATIONSHIPS_BATCH))
        .map(|batch| graph.store_relationships(batch))
        .buffer_unordered(STORE_RELATIONSHIPS_CONCURRENCY)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<()>, _>>()?;
    Ok(())
}

fn to_writes(links: &[discovery_core::relationship::Relationship]) -> Vec<RelationshipWrite> {
    links
        .iter()
        .map(|r| RelationshipWrite {
            source: r.source.as_str().to_string(),
            label: r.label.clone(),
            target: r.target.as_str().to_string(),
        })
        .collect()
}
