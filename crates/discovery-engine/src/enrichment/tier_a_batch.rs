//! Tier A — BatchResources: entities the aggregator doesn't reliably
//! surface, constructed directly from each service's list/describe API.
//! Handlers run concurrently, once per `(account, region)` pair (or once
//! per account for global services).

use discovery_core::relationship::Relationship;
use discovery_core::resource::Resource;

use crate::client_set::ClientSet;
use crate::enrichment::HandlerFailure;

const HANDLER_APP_REGISTRY: &str = "app_registry_applications";
const HANDLER_MEDIA_FLOWS: &str = "media_flows";
const HANDLER_MANAGED_POLICIES: &str = "managed_policies";
const HANDLER_TARGET_GROUPS: &str = "target_groups";
const HANDLER_SPOT_REQUESTS: &str = "spot_instance_requests";
const HANDLER_SPOT_FLEETS: &str = "spot_fleet_requests";
const HANDLER_SEARCH_DOMAINS: &str = "search_domains";

/// Output of one `(account, region)` pass over every Tier-A handler.
#[derive(Default)]
pub struct TierAOutput {
    pub resources: Vec<Resource>,
    pub failures: Vec<HandlerFailure>,
}

/// Runs every regional Tier-A handler for one `(account, region)` pair.
/// Global handlers (managed policies) are run once per account by the
/// caller, not here — see [`run_global_handlers`].
pub async fn run_regional_handlers(clients: &ClientSet, account_id: &str) -> TierAOutput {
    let region = clients.region.clone();
    let mut out = TierAOutput::default();

    let (app_registry, media_flows, target_groups, spot_requests, spot_fleets, search_domains) = tokio::join!(
        app_registry_applications(clients, account_id),
        media_flows(clients, account_id),
        target_groups(clients, account_id),
        spot_instance_requests(clients, account_id),
        spot_fleet_requests(clients, account_id),
        search_domains(clients, account_id),
    );

    for (resources, failure) in [
        app_registry,
        media_flows,
        target_groups,
        spot_requests,
        search_domains,
    ] {
        out.resources.extend(resources);
        out.failures.extend(failure);
    }
    let (fleet_resources, fleet_failures) = spot_fleets;
    out.resources.extend(fleet_resources);
    out.failures.extend(fleet_failures);

    let _ = region;
    out
}

/// Provider-owned managed policies — global, run once per account rather
/// than once per `(account, region)` pair.
pub async fn run_global_handlers(clients: &ClientSet, account_id: &str) -> TierAOutput {
    let (resources, failures) = managed_policies(clients, account_id).await;
    TierAOutput { resources, failures }
}

async fn app_registry_applications(clients: &ClientSet, account_id: &str) -> (Vec<Resource>, Vec<HandlerFailure>) {
    match clients.appregistry.list_applications(&clients.identity, &clients.region).await {
        Ok(apps) => {
            let resources = apps
                .into_iter()
                .map(|app| {
                    Resource::new(
                        app.arn,
                        account_id,
                        clients.region.clone(),
                        "AWS::ServiceCatalogAppRegistry::Application",
                        app.id,
                    )
                    .with_name(app.name)
                })
                .collect();
            (resources, Vec::new())
        }
        Err(err) => (
            Vec::new(),
            vec![HandlerFailure::new(HANDLER_APP_REGISTRY, account_id, &clients.region, err)],
        ),
    }
}

async fn media_flows(clients: &ClientSet, account_id: &str) -> (Vec<Resource>, Vec<HandlerFailure>) {
    match clients.mediaconnect.list_flows(&clients.identity, &clients.region).await {
        Ok(flows) => {
            let resources = flows
                .into_iter()
                .map(|flow| {
                    Resource::new(
                        flow.flow_arn.clone(),
                        account_id,
                        clients.region.clone(),
                        "AWS::MediaConnect::Flow",
                        flow.flow_arn,
                    )
                    .with_name(flow.name)
                })
                .collect();
            (resources, Vec::new())
        }
        Err(err) => (
            Vec::new(),
            vec![HandlerFailure::new(HANDLER_MEDIA_FLOWS, account_id, &clients.region, err)],
        ),
    }
}

/// `AWS`-owned managed policies. These carry `accountId = "aws"` per the
/// spec's global-resource convention, not the crawling account's id.
async fn managed_policies(clients: &ClientSet, account_id: &str) -> (Vec<Resource>, Vec<HandlerFailure>) {
    match clients.iam.list_aws_managed_policies(&clients.identity).await {
        Ok(policies) => {
            let resources = policies
                .into_iter()
                .map(|policy| {
                    Resource::new(
                        policy.arn,
                        "aws",
                        discovery_core::constants::GLOBAL_REGION,
                        "AWS::IAM::ManagedPolicy",
                        policy.policy_name.clone(),
                    )
                    .with_name(policy.policy_name)
                })
                .collect();
            (resources, Vec::new())
        }
        Err(err) => (
            Vec::new(),
            vec![HandlerFailure::new(HANDLER_MANAGED_POLICIES, account_id, "global", err)],
        ),
    }
}

async fn target_groups(clients: &ClientSet, account_id: &str) -> (Vec<Resource>, Vec<HandlerFailure>) {
    match clients.elbv2.describe_target_groups(&clients.identity, &clients.region).await {
        Ok(groups) => {
            let resources = groups
                .into_iter()
                .map(|tg| {
                    Resource::new(
                        tg.target_group_arn.clone(),
                        account_id,
                        clients.region.clone(),
                        "AWS::ElasticLoadBalancingV2::TargetGroup",
                        tg.target_group_arn,
                    )
                    .with_name(tg.target_group_name)
                })
                .collect();
            (resources, Vec::new())
        }
        Err(err) => (
            Vec::new(),
            vec![HandlerFailure::new(HANDLER_TARGET_GROUPS, account_id, &clients.region, err)],
        ),
    }
}

async fn spot_instance_requests(clients: &ClientSet, account_id: &str) -> (Vec<Resource>, Vec<HandlerFailure>) {
    match clients.ec2.describe_spot_instance_requests(&clients.identity, &clients.region).await {
        Ok(requests) => {
            let resources = requests
                .into_iter()
                .map(|r| {
                    let id = format!(
                        "arn:aws:ec2:{}:{}:spot-instances-request/{}",
                        clients.region, account_id, r.spot_instance_request_id
                    );
                    Resource::new(
                        id,
                        account_id,
                        clients.region.clone(),
                        "AWS::EC2::SpotInstanceRequest",
                        r.spot_instance_request_id,
                    )
                })
                .collect();
            (resources, Vec::new())
        }
        Err(err) => (
            Vec::new(),
            vec![HandlerFailure::new(HANDLER_SPOT_REQUESTS, account_id, &clients.region, err)],
        ),
    }
}

/// A spot-fleet resource carries `ASSOCIATED_WITH` edges to every instance
/// launched in its name, identified by the `aws:ec2spot:fleet-request-id`
/// tag — the aggregator surfaces the fleet request but not its membership.
async fn spot_fleet_requests(clients: &ClientSet, account_id: &str) -> (Vec<Resource>, Vec<HandlerFailure>) {
    let fleets = match clients.ec2.describe_spot_fleet_requests(&clients.identity, &clients.region).await {
        Ok(fleets) => fleets,
        Err(err) => {
            return (
                Vec::new(),
                vec![HandlerFailure::new(HANDLER_SPOT_FLEETS, account_id, &clients.region, err)],
            )
        }
    };

    let mut resources = Vec::new();
    let mut failures = Vec::new();
    for fleet in fleets {
        let id = format!(
            "arn:aws:ec2:{}:{}:spot-fleet-request/{}",
            clients.region, account_id, fleet.spot_fleet_request_id
        );
        let mut resource = Resource::new(
            id.clone(),
            account_id,
            clients.region.clone(),
            "AWS::EC2::SpotFleetRequest",
            fleet.spot_fleet_request_id.clone(),
        );
        match clients
            .ec2
            .describe_instances_by_fleet_tag(&fleet.spot_fleet_request_id, &clients.identity, &clients.region)
            .await
        {
            Ok(instance_ids) => {
                for instance_id in instance_ids {
                    let instance_arn =
                        format!("arn:aws:ec2:{}:{}:instance/{}", clients.region, account_id, instance_id);
                    resource.relationships.push(Relationship::new(id.clone(), "ASSOCIATED_WITH", instance_arn));
                }
            }
            Err(err) => failures.push(HandlerFailure::new(HANDLER_SPOT_FLEETS, account_id, &clients.region, err)),
        }
        resources.push(resource);
    }
    (resources, failures)
}

async fn search_domains(clients: &ClientSet, account_id: &str) -> (Vec<Resource>, Vec<HandlerFailure>) {
    match clients.opensearch.list_and_describe_domains(&clients.identity, &clients.region).await {
        Ok(domains) => {
            let resources = domains
                .into_iter()
                .map(|d| {
                    let mut resource = Resource::new(
                        d.arn,
                        account_id,
                        clients.region.clone(),
                        "AWS::OpenSearch::Domain",
                        d.domain_name.clone(),
                    )
                    .with_name(d.domain_name);
                    if let Some(endpoint) = d.endpoint {
                        resource.supplementary_configuration = serde_json::json!({ "endpoint": endpoint });
                    }
                    resource
                })
                .collect();
            (resources, Vec::new())
        }
        Err(err) => (
            Vec::new(),
            vec![HandlerFailure::new(HANDLER_SEARCH_DOMAINS, account_id, &clients.region, err)],
        ),
    }
}
