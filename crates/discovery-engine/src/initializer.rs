//! Preflight checks run once at the start of every crawl (§4.3).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::{DiscoveryConfig, DiscoveryMode};
use crate::error::EngineError;

/// A boxed, `Send` future — the same shape `claria-provisioner::syncer`
/// uses so trait methods returning futures stay dyn-compatible.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One provider service endpoint the Initializer must be able to reach
/// before a crawl can proceed. Host/port pairs stand in for the regional
/// service endpoints VPC routing must resolve.
struct Endpoint {
    name: &'static str,
    host: String,
    port: u16,
}

fn fixed_endpoints(region: &str, organization_mode: bool) -> Vec<Endpoint> {
    let mut endpoints = vec![
        Endpoint { name: "sts", host: format!("sts.{region}.amazonaws.com"), port: 443 },
        Endpoint { name: "iam", host: "iam.amazonaws.com".to_string(), port: 443 },
        Endpoint { name: "config", host: format!("config.{region}.amazonaws.com"), port: 443 },
        Endpoint { name: "apigateway", host: format!("apigateway.{region}.amazonaws.com"), port: 443 },
        Endpoint { name: "ec2", host: format!("ec2.{region}.amazonaws.com"), port: 443 },
        Endpoint { name: "ecs", host: format!("ecs.{region}.amazonaws.com"), port: 443 },
        Endpoint { name: "iam-identity-center", host: format!("identitystore.{region}.amazonaws.com"), port: 443 },
        Endpoint { name: "opensearch", host: format!("es.{region}.amazonaws.com"), port: 443 },
        Endpoint { name: "logs", host: format!("logs.{region}.amazonaws.com"), port: 443 },
        Endpoint { name: "graph-store", host: "graph-store".to_string(), port: 443 },
    ];
    if organization_mode {
        endpoints.push(Endpoint {
            name: "organizations",
            host: "organizations.us-east-1.amazonaws.com".to_string(),
            port: 443,
        });
    }
    endpoints
}

/// Probes every fixed endpoint concurrently; returns the names of every
/// endpoint that failed to connect within `PROBE_TIMEOUT`.
async fn probe_vpc_reachability(region: &str, organization_mode: bool) -> Vec<String> {
    let endpoints = fixed_endpoints(region, organization_mode);
    let futures = endpoints.into_iter().map(|ep| async move {
        let addr = format!("{}:{}", ep.host, ep.port);
        match timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => None,
            _ => Some(ep.name.to_string()),
        }
    });
    futures::future::join_all(futures).await.into_iter().flatten().collect()
}

/// Reports how many tasks of this task definition family (ignoring the
/// version suffix) are currently running — used to detect a concurrent
/// instance of the discovery task.
pub trait TaskInventoryProbe: Send + Sync {
    fn running_task_count<'a>(&'a self, cluster_name: &'a str) -> BoxFuture<'a, Result<usize, EngineError>>;
}

/// The real `TaskInventoryProbe`: lists every task running in the cluster,
/// describes them in batches of 100 (the API's own limit), and counts how
/// many share this process's own task-definition family, ignoring the
/// `:revision` suffix.
pub struct ClusterTaskInventory<'a> {
    pub ecs: &'a discovery_provider::clients::ecs::EcsClient,
    pub own_task_definition_family: String,
    pub identity: String,
    pub region: String,
}

const DESCRIBE_TASKS_BATCH: usize = 100;

impl TaskInventoryProbe for ClusterTaskInventory<'_> {
    fn running_task_count<'a>(&'a self, cluster_name: &'a str) -> BoxFuture<'a, Result<usize, EngineError>> {
        Box::pin(async move {
            let tasks = self.ecs.list_tasks_for_cluster(cluster_name, &self.identity, &self.region).await?;
            if tasks.is_empty() {
                return Ok(0);
            }

            let arns: Vec<String> = tasks.into_iter().map(|t| t.task_arn).collect();
            let mut count = 0;
            for batch in arns.chunks(DESCRIBE_TASKS_BATCH) {
                let details = self.ecs.describe_tasks(cluster_name, batch, &self.identity, &self.region).await?;
                count += details
                    .iter()
                    .filter(|d| task_definition_family(&d.task_definition_arn) == self.own_task_definition_family)
                    .count();
            }
            Ok(count)
        })
    }
}

/// `arn:aws:ecs:region:account:task-definition/family:revision` → `family`.
fn task_definition_family(task_definition_arn: &str) -> &str {
    let after_slash = task_definition_arn.rsplit('/').next().unwrap_or(task_definition_arn);
    after_slash.rsplit_once(':').map(|(family, _)| family).unwrap_or(after_slash)
}

pub struct Initializer<'a> {
    config: &'a DiscoveryConfig,
}

impl<'a> Initializer<'a> {
    pub fn new(config: &'a DiscoveryConfig) -> Self {
        Self { config }
    }

    pub async fn run(
        &self,
        task_inventory: &dyn TaskInventoryProbe,
        config_service: &discovery_provider::clients::config_service::ConfigServiceClient,
        identity: &str,
    ) -> Result<(), EngineError> {
        let organization_mode = self.config.cross_account_discovery == DiscoveryMode::Organizations;

        let unreachable = probe_vpc_reachability(&self.config.region, organization_mode).await;
        if !unreachable.is_empty() {
            return Err(EngineError::VpcConfigurationValidation(unreachable));
        }

        let running = task_inventory
            .running_task_count(&self.config.cluster_name)
            .await?;
        if running > 1 {
            return Err(EngineError::DiscoveryAlreadyRunning);
        }

        if organization_mode {
            config_service
                .validate_organization_aggregator(&self.config.config_aggregator_name, identity)
                .await
                .map_err(|e| match e {
                    discovery_provider::ProviderError::AggregatorNotFound(name) => {
                        EngineError::AggregatorNotFound(name)
                    }
                    other => EngineError::Provider(other),
                })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCount(usize);

    impl TaskInventoryProbe for FixedCount {
        fn running_task_count<'a>(&'a self, _cluster_name: &'a str) -> BoxFuture<'a, Result<usize, EngineError>> {
            Box::pin(async move { Ok(self.0) })
        }
    }

    #[tokio::test]
    async fn single_running_task_is_not_a_conflict() {
        let probe = FixedCount(1);
        assert_eq!(probe.running_task_count("cluster").await.unwrap(), 1);
    }

    #[test]
    fn task_definition_family_strips_the_revision_suffix() {
        assert_eq!(
            task_definition_family("arn:aws:ecs:us-east-1:111111111111:task-definition/discovery-process:7"),
            "discovery-process"
        );
    }

    #[tokio::test]
    async fn two_running_tasks_signal_a_conflict() {
        let probe = FixedCount(2);
        let count = probe.running_task_count("cluster").await.unwrap();
        assert!(count > 1);
    }
}
