use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single region's crawl status within an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRegion {
    pub name: String,
    pub last_crawled: Option<String>,
    pub is_config_enabled: Option<bool>,
}

/// Per-type resource counts for one region, rolled up by the
/// `RegionMetadataAggregator`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceTypeCount {
    pub resource_type: String,
    pub count: u64,
}

/// A single region's resource-count rollup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionResourceMetadata {
    pub name: String,
    pub count: u64,
    pub resource_types: Vec<ResourceTypeCount>,
}

/// Per-account rollup attached by the `RegionMetadataAggregator` and
/// persisted alongside `lastCrawled`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesRegionMetadata {
    pub count: u64,
    pub regions: Vec<RegionResourceMetadata>,
}

/// An AWS account tracked by the discovery system.
///
/// `credentials` is intentionally absent from this type: the spec requires
/// that per-account credentials never leave process memory and never reach
/// persisted storage. Callers that need live credentials for a crawl carry
/// them alongside an `Account`, not inside it (see
/// `discovery-engine::account_resolver::ResolvedAccount`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub organization_id: Option<String>,
    pub name: String,
    pub is_management_account: Option<bool>,
    pub is_iam_role_deployed: bool,
    pub last_crawled: Option<String>,
    pub regions: Vec<AccountRegion>,
    pub to_delete: bool,
    pub resources_region_metadata: Option<ResourcesRegionMetadata>,
}

impl Account {
    pub fn new(account_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            organization_id: None,
            name: name.into(),
            is_management_account: None,
            is_iam_role_deployed: false,
            last_crawled: None,
            regions: Vec::new(),
            to_delete: false,
            resources_region_metadata: None,
        }
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|r| r.name.as_str())
    }

    /// Eligible for enrichment: trust was assumed successfully and the
    /// account is not marked for deletion.
    pub fn is_eligible(&self) -> bool {
        self.is_iam_role_deployed && !self.to_delete
    }
}

pub type AccountsMap = HashMap<String, Account>;
