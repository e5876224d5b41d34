//! Wires every stage of a crawl together end to end (§5's control-flow
//! diagram): Initializer, AccountResolver, the parallel baseline read,
//! per-`(account, region)` enrichment, relationship inference, the delta
//! engine, the persister, and the region metadata rollup.

use std::collections::{HashMap, HashSet};

use discovery_core::account::AccountsMap;
use discovery_core::resource::Resource;
use discovery_provider::clients::config_service::ConfigServiceClient;
use discovery_provider::clients::ecs::EcsClient;
use discovery_provider::clients::organizations::OrganizationsClient;
use discovery_provider::clients::sts::StsClient;
use discovery_provider::Throttler;
use discovery_store::{GraphStoreClient, SearchIndexClient};

use crate::client_set::{self, ClientSet};
use crate::config::{DiscoveryConfig, DiscoveryMode};
use crate::enrichment::{tier_a_batch, tier_b_first_order, tier_c_second_order, tier_d_tags, HandlerFailure};
use crate::error::EngineError;
use crate::initializer::{ClusterTaskInventory, Initializer};
use crate::{account_resolver, aggregator_reader, delta, inference, persister, region_metadata};

const DEFAULT_TASK_DEFINITION_FAMILY: &str = "discovery-process";

/// What one crawl did, logged as a single structured summary event at the
/// end of `Orchestrator::run` (§14).
#[derive(Debug, Default)]
pub struct CrawlSummary {
    pub accounts_crawled: usize,
    pub resources_discovered: usize,
    pub resources_stored: usize,
    pub resources_updated: usize,
    pub resources_deleted: usize,
    pub links_added: usize,
    pub links_deleted: usize,
    pub handler_failures: usize,
    pub dry_run: bool,
}

pub struct Orchestrator {
    config: DiscoveryConfig,
}

impl Orchestrator {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<CrawlSummary, EngineError> {
        let organization_mode = self.config.cross_account_discovery == DiscoveryMode::Organizations;
        let throttler = Throttler::new();

        let root_sdk_config = client_set_bootstrap(&self.config.region, &self.config.custom_user_agent).await;
        let sts = StsClient::new(&root_sdk_config, throttler.clone());
        let organizations = OrganizationsClient::new(&root_sdk_config, throttler.clone());
        let root_config_service = ConfigServiceClient::new(&root_sdk_config, throttler.clone());
        let ecs = EcsClient::new(&root_sdk_config, throttler.clone());

        let identity = sts.get_caller_identity("bootstrap").await?;

        let own_task_definition_family =
            std::env::var("TASK_DEFINITION_FAMILY").unwrap_or_else(|_| DEFAULT_TASK_DEFINITION_FAMILY.to_string());
        let task_inventory = ClusterTaskInventory {
            ecs: &ecs,
            own_task_definition_family,
            identity: identity.clone(),
            region: self.config.region.clone(),
        };

        Initializer::new(&self.config).run(&task_inventory, &root_config_service, &identity).await?;

        let graph = GraphStoreClient::new(&self.config.graph_store_url);
        let search = SearchIndexClient::new(&self.config.search_index_url);

        let stored_accounts = graph.read_all_accounts().await?;
        let stored_accounts: AccountsMap = stored_accounts
            .into_iter()
            .filter_map(|(id, value)| serde_json::from_value(value).ok().map(|account| (id, account)))
            .collect();
        let previously_known: HashSet<String> = stored_accounts.keys().cloned().collect();

        let accounts =
            account_resolver::resolve_authoritative_accounts(&self.config, &organizations, &stored_accounts, &identity)
                .await?;

        let region_names = accounts
            .values()
            .flat_map(|a| a.region_names().map(str::to_string))
            .chain(std::iter::once(self.config.region.clone()))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();

        let root_region = self.config.region.clone();
        let custom_user_agent = self.config.custom_user_agent.clone();
        let mut accounts = account_resolver::assume_trust_and_probe_regions(
            &self.config,
            accounts,
            &sts,
            &region_names,
            |creds| {
                let config = futures::executor::block_on(client_set::sdk_config_for(&root_region, creds, &custom_user_agent));
                ConfigServiceClient::new(&config, throttler.clone())
            },
            &identity,
        )
        .await;

        let (baseline, db_resources, db_relationships) = {
            let eligible_accounts: AccountsMap =
                accounts.iter().filter(|(_, a)| a.is_eligible()).map(|(k, v)| (k.clone(), v.clone())).collect();
            tokio::try_join!(
                aggregator_reader::read_baseline(&root_config_service, &self.config.config_aggregator_name, &identity, &eligible_accounts),
                async { graph.read_all_resources(50_000).await.map_err(EngineError::from) },
                async { graph.read_all_relationships(100_000).await.map_err(EngineError::from) },
            )?
        };

        let mut working_set = baseline;

        // Re-assume credentials per eligible account so enrichment can build
        // a `ClientSet` for every `(account, region)` pair this crawl covers.
        let mut clients_by_key: HashMap<(String, String), ClientSet> = HashMap::new();
        let mut all_failures: Vec<HandlerFailure> = Vec::new();

        for account in accounts.values().filter(|a| a.is_eligible()) {
            let role_arn = self.config.discovery_role_arn(&account.account_id);
            let creds = match sts.assume_role(&role_arn, "discovery-crawl", &identity).await {
                Ok(creds) => creds,
                Err(_) => continue,
            };

            for region in account.region_names() {
                let sdk_config = client_set::sdk_config_for(region, &creds, &self.config.custom_user_agent).await;
                let clients = ClientSet::new(&sdk_config, throttler.clone(), &account.account_id, region);

                let (regional, global) = tokio::join!(
                    tier_a_batch::run_regional_handlers(&clients, &account.account_id),
                    tier_a_batch::run_global_handlers(&clients, &account.account_id),
                );
                working_set.extend(regional.resources);
                all_failures.extend(regional.failures);
                working_set.extend(global.resources);
                all_failures.extend(global.failures);

                clients_by_key.insert((account.account_id.clone(), region.to_string()), clients);
            }
        }

        for ((account_id, _region), clients) in &clients_by_key {
            let tier_b = tier_b_first_order::run(clients, account_id, &working_set).await;
            let tier_c = tier_c_second_order::run(clients, account_id, &tier_b.resources).await;
            all_failures.extend(tier_b.failures);
            all_failures.extend(tier_c.failures);
            working_set.extend(tier_b.resources);
            working_set.extend(tier_c.resources);
        }

        working_set.extend(tier_d_tags::synthesize(&working_set));

        all_failures.extend(inference::run(&mut working_set, &clients_by_key).await);

        for failure in &all_failures {
            tracing::warn!(
                handler = failure.handler,
                account_id = %failure.account_id,
                region = %failure.region,
                error = %failure.error,
                "enrichment handler failed"
            );
        }

        let resources_discovered = working_set.len();
        let delta = delta::compute(&working_set, &db_resources, &db_relationships);

        let dry_run = DiscoveryConfig::dry_run();
        let mut summary = CrawlSummary {
            accounts_crawled: accounts.values().filter(|a| a.is_eligible()).count(),
            resources_discovered,
            resources_stored: delta.resources_to_store.len(),
            resources_updated: delta.resources_to_update.len(),
            resources_deleted: delta.resource_ids_to_delete.len(),
            links_added: delta.links_to_add.len(),
            links_deleted: delta.links_to_delete.len(),
            handler_failures: all_failures.len(),
            dry_run,
        };

        if dry_run {
            tracing::info!(
                resources_to_store = delta.resources_to_store.len(),
                resources_to_update = delta.resources_to_update.len(),
                resources_to_delete = delta.resource_ids_to_delete.len(),
                links_to_add = delta.links_to_add.len(),
                links_to_delete = delta.links_to_delete.len(),
                "dry run: delta computed, no writes issued"
            );
            return Ok(summary);
        }

        let outcome = persister::persist(&graph, &search, &delta).await?;

        let reconciled = reconcile(&working_set, &delta, &outcome, &db_resources);

        let crawled_at = chrono::Utc::now().to_rfc3339();
        region_metadata::roll_up(&mut accounts, &reconciled, &crawled_at);

        if organization_mode {
            let buckets = region_metadata::split_accounts(&accounts, &previously_known);
            region_metadata::persist_accounts(&graph, &buckets).await?;
        } else {
            let buckets = region_metadata::AccountBuckets {
                to_add: Vec::new(),
                to_update: accounts.values().cloned().collect(),
                to_delete: Vec::new(),
            };
            region_metadata::persist_accounts(&graph, &buckets).await?;
        }

        summary.resources_stored -= outcome.failed_stores.len().min(summary.resources_stored);

        tracing::info!(
            accounts_crawled = summary.accounts_crawled,
            resources_discovered = summary.resources_discovered,
            resources_stored = summary.resources_stored,
            resources_updated = summary.resources_updated,
            resources_deleted = summary.resources_deleted,
            links_added = summary.links_added,
            links_deleted = summary.links_deleted,
            handler_failures = summary.handler_failures,
            "crawl complete"
        );

        Ok(summary)
    }
}

async fn client_set_bootstrap(region: &str, custom_user_agent: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .app_name(
            aws_config::AppName::new(custom_user_agent.to_string())
                .unwrap_or_else(|_| aws_config::AppName::new("discovery-process").unwrap()),
        )
        .load()
        .await
}

/// Removes ids the persister's `failed_stores` rejected and restores the
/// pre-crawl stored copy for every id in `failed_deletes`, so
/// `region_metadata::roll_up` reflects what is actually present in both
/// stores rather than what this crawl merely attempted to write (§4.10).
fn reconcile(
    working_set: &[Resource],
    delta: &delta::Delta,
    outcome: &persister::PersistOutcome,
    db_resources: &[discovery_store::graph_client::StoredResource],
) -> Vec<Resource> {
    let failed_stores: HashSet<&str> = outcome.failed_stores.iter().map(String::as_str).collect();
    let failed_deletes: HashSet<&str> = outcome.failed_deletes.iter().map(String::as_str).collect();
    let deleted: HashSet<&str> = delta.resource_ids_to_delete.iter().map(String::as_str).collect();

    let mut reconciled: Vec<Resource> =
        working_set.iter().filter(|r| !failed_stores.contains(r.id.as_str())).cloned().collect();

    if !failed_deletes.is_empty() {
        let live_ids: HashSet<&str> = reconciled.iter().map(|r| r.id.as_str()).collect();
        for stored in db_resources {
            if deleted.contains(stored.id.as_str())
                && failed_deletes.contains(stored.id.as_str())
                && !live_ids.contains(stored.id.as_str())
            {
                if let Some(resource) = stored_to_resource(stored) {
                    reconciled.push(resource);
                }
            }
        }
    }

    reconciled
}

/// Rebuilds enough of a `Resource` from a `StoredResource` to participate in
/// `region_metadata::roll_up`'s by-type counting — only the four fields the
/// rollup actually reads.
fn stored_to_resource(stored: &discovery_store::graph_client::StoredResource) -> Option<Resource> {
    let properties = stored.properties.as_object()?;
    let account_id = properties.get("accountId")?.as_str()?.to_string();
    let region = properties.get("region")?.as_str()?.to_string();
    let resource_type = stored.label.replacen('_', "::", 2);
    let resource_id = properties.get("resourceId").and_then(|v| v.as_str()).unwrap_or(&stored.id).to_string();
    Some(Resource::new(stored.id.clone(), account_id, region, resource_type, resource_id))
}
