//! RegionMetadataAggregator (§4.11): rolls up the reconciled resource set
//! by `(accountId, region, resourceType)` and attaches the result to each
//! account alongside `lastCrawled`. In organization mode, also splits the
//! account list into add/update/delete buckets for `Persister(accounts)`.

use std::collections::{HashMap, HashSet};

use discovery_core::account::{Account, AccountsMap, RegionResourceMetadata, ResourceTypeCount, ResourcesRegionMetadata};
use discovery_core::resource::Resource;
use discovery_store::GraphStoreClient;

use crate::error::EngineError;

/// Groups `reconciled` by `(accountId, region, resourceType)` and attaches
/// the rollup to each matching account in `accounts`. `lastCrawled` only
/// advances for accounts where trust assumption succeeded this crawl —
/// per §4.4's testable property, an account with `isIamRoleDeployed =
/// false` never has `lastCrawled` advanced.
pub fn roll_up(accounts: &mut AccountsMap, reconciled: &[Resource], crawled_at: &str) {
    let mut counts: HashMap<(String, String, String), u64> = HashMap::new();
    for resource in reconciled {
        *counts
            .entry((resource.account_id.clone(), resource.region.clone(), resource.resource_type.clone()))
            .or_insert(0) += 1;
    }

    let mut by_account: HashMap<String, HashMap<String, Vec<ResourceTypeCount>>> = HashMap::new();
    for ((account_id, region, resource_type), count) in counts {
        by_account.entry(account_id).or_default().entry(region).or_default().push(ResourceTypeCount {
            resource_type,
            count,
        });
    }

    for (account_id, regions) in by_account {
        let Some(account) = accounts.get_mut(&account_id) else { continue };

        let mut region_metadata: Vec<RegionResourceMetadata> = regions
            .into_iter()
            .map(|(name, resource_types)| RegionResourceMetadata {
                count: resource_types.iter().map(|t| t.count).sum(),
                name,
                resource_types,
            })
            .collect();
        region_metadata.sort_by(|a, b| a.name.cmp(&b.name));

        let total = region_metadata.iter().map(|r| r.count).sum();
        account.resources_region_metadata = Some(ResourcesRegionMetadata { count: total, regions: region_metadata });

        if account.is_iam_role_deployed {
            account.last_crawled = Some(crawled_at.to_string());
            for region in &mut account.regions {
                region.last_crawled = Some(crawled_at.to_string());
            }
        }
    }
}

/// The three organization-mode account buckets. `to_add` is every account
/// not previously known to the store; `to_delete` is every account marked
/// `to_delete`; everything else is `to_update`.
pub struct AccountBuckets {
    pub to_add: Vec<Account>,
    pub to_update: Vec<Account>,
    pub to_delete: Vec<Account>,
}

pub fn split_accounts(accounts: &AccountsMap, previously_known: &HashSet<String>) -> AccountBuckets {
    let mut to_add = Vec::new();
    let mut to_update = Vec::new();
    let mut to_delete = Vec::new();

    for account in accounts.values() {
        if account.to_delete {
            to_delete.push(account.clone());
        } else if previously_known.contains(&account.account_id) {
            to_update.push(account.clone());
        } else {
            to_add.push(account.clone());
        }
    }

    AccountBuckets { to_add, to_update, to_delete }
}

/// Persists all three buckets with settled-all semantics — a failure in
/// one bucket's mutation doesn't prevent the others from running. Returns
/// the first error encountered, if any, only after every bucket has been
/// attempted.
pub async fn persist_accounts(graph: &GraphStoreClient, buckets: &AccountBuckets) -> Result<(), EngineError> {
    let (add_result, update_result, delete_result) = tokio::join!(
        upsert(graph, &buckets.to_add),
        upsert(graph, &buckets.to_update),
        upsert(graph, &buckets.to_delete),
    );
    add_result?;
    update_result?;
    delete_result?;
    Ok(())
}

async fn upsert(graph: &GraphStoreClient, accounts: &[Account]) -> Result<(), EngineError> {
    if accounts.is_empty() {
        return Ok(());
    }
    let mut batch = HashMap::with_capacity(accounts.len());
    for account in accounts {
        batch.insert(account.account_id.clone(), serde_json::to_value(account)?);
    }
    graph.upsert_accounts(&batch).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::account::AccountRegion;

    fn account(id: &str, is_iam_role_deployed: bool) -> Account {
        let mut account = Account::new(id, "example");
        account.is_iam_role_deployed = is_iam_role_deployed;
        account.regions.push(AccountRegion { name: "us-east-1".into(), last_crawled: None, is_config_enabled: Some(true) });
        account
    }

    #[test]
    fn roll_up_counts_by_account_region_and_type() {
        let mut accounts = AccountsMap::new();
        accounts.insert("111111111111".into(), account("111111111111", true));

        let resources = vec![
            Resource::new("arn:1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1"),
            Resource::new("arn:2", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-2"),
            Resource::new("arn:3", "111111111111", "us-east-1", "AWS::EC2::Volume", "vol-1"),
        ];

        roll_up(&mut accounts, &resources, "2026-07-28T00:00:00Z");

        let metadata = accounts["111111111111"].resources_region_metadata.as_ref().unwrap();
        assert_eq!(metadata.count, 3);
        assert_eq!(metadata.regions.len(), 1);
        assert_eq!(metadata.regions[0].resource_types.len(), 2);
    }

    #[test]
    fn last_crawled_never_advances_when_trust_was_not_assumed() {
        let mut accounts = AccountsMap::new();
        accounts.insert("111111111111".into(), account("111111111111", false));

        let resources = vec![Resource::new("arn:1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1")];
        roll_up(&mut accounts, &resources, "2026-07-28T00:00:00Z");

        assert!(accounts["111111111111"].last_crawled.is_none());
        assert!(accounts["111111111111"].resources_region_metadata.is_some());
    }

    #[test]
    fn split_accounts_buckets_by_to_delete_and_prior_knowledge() {
        let mut accounts = AccountsMap::new();
        let mut new_account = account("222222222222", true);
        new_account.to_delete = false;
        accounts.insert("222222222222".into(), new_account);

        let mut known_account = account("333333333333", true);
        known_account.to_delete = false;
        accounts.insert("333333333333".into(), known_account);

        let mut deleted_account = account("444444444444", true);
        deleted_account.to_delete = true;
        accounts.insert("444444444444".into(), deleted_account);

        let mut previously_known = HashSet::new();
        previously_known.insert("333333333333".to_string());
        previously_known.insert("444444444444".to_string());

        let buckets = split_accounts(&accounts, &previously_known);
        assert_eq!(buckets.to_add.len(), 1);
        assert_eq!(buckets.to_update.len(), 1);
        assert_eq!(buckets.to_delete.len(), 1);
    }
}
