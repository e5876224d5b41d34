//! Dual-store write coordination (§4.10).
//!
//! Resource mutations are never sent to the graph store directly: the
//! search-index mutation runs first, and the graph-store mutation only
//! processes the subset of items the search index accepted. A partial
//! search-index failure therefore never produces a resource that exists in
//! the graph store but not the search index.

use std::collections::HashSet;

use crate::error::StoreError;
use crate::graph_client::{GraphStoreClient, ResourceWrite};
use crate::search_client::SearchIndexClient;

/// Outcome of one dual-store batch mutation: which ids were accepted by
/// both stores, and which were rejected by the search index and so never
/// reached the graph store at all.
#[derive(Debug, Clone, Default)]
pub struct DualWriteOutcome {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
}

/// Runs `search_op` against `batch`, then `graph_op` against only the
/// accepted subset. `search_op`/`graph_op` close over which of
/// index/update/delete is being performed.
pub async fn store_batch(
    search: &SearchIndexClient,
    graph: &GraphStoreClient,
    batch: &[ResourceWrite],
    is_update: bool,
) -> Result<DualWriteOutcome, StoreError> {
    let search_result = if is_update {
        search.update(batch).await?
    } else {
        search.index(batch).await?
    };
    let rejected: HashSet<String> = search_result.unprocessed_resources.into_iter().collect();

    let accepted_batch: Vec<ResourceWrite> = batch
        .iter()
        .filter(|r| !rejected.contains(&r.id))
        .cloned()
        .collect();

    if !accepted_batch.is_empty() {
        if is_update {
            graph.update_resources(&accepted_batch).await?;
        } else {
            graph.store_resources(&accepted_batch).await?;
        }
    }

    Ok(DualWriteOutcome {
        accepted: accepted_batch.into_iter().map(|r| r.id).collect(),
        rejected: rejected.into_iter().collect(),
    })
}

pub async fn delete_batch(
    search: &SearchIndexClient,
    graph: &GraphStoreClient,
    ids: &[String],
) -> Result<DualWriteOutcome, StoreError> {
    let search_result = search.delete_indexed(ids).await?;
    let rejected: HashSet<String> = search_result.unprocessed_resources.into_iter().collect();

    let accepted_ids: Vec<String> = ids.iter().filter(|id| !rejected.contains(*id)).cloned().collect();

    if !accepted_ids.is_empty() {
        graph.delete_resources(&accepted_ids).await?;
    }

    Ok(DualWriteOutcome {
        accepted: accepted_ids,
        rejected: rejected.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_ids_never_reach_the_graph_store_in_outcome() {
        let outcome = DualWriteOutcome {
            accepted: vec!["a".into()],
            rejected: vec!["b".into()],
        };
        assert!(!outcome.accepted.contains(&"b".to_string()));
    }
}
