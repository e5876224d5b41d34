//! Stage 2 — per-resource inference, concurrency 30. Every resource in the
//! working set gets a schema-driven pass (`super::schema::evaluate`) and a
//! hard-coded pass (`hard_coded::dispatch`, this module). A handler that
//! needs to mutate a resource other than the one it was dispatched for
//! (e.g. the container-task handler marking an ENI as attached) returns a
//! `CrossEdge` instead of touching `working_set` directly — the borrow
//! checker won't allow two live mutable borrows into the same `Vec` from
//! concurrent tasks, so cross-resource edges are collected and merged in a
//! single sequential pass once the concurrent fan-out settles.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};

use discovery_core::ids::ResourceId;
use discovery_core::relationship::Relationship;
use discovery_core::resource::Resource;

use crate::client_set::ClientSet;
use crate::enrichment::HandlerFailure;

use super::lookup_maps::LookupMaps;
use super::schema;

const CONCURRENCY: usize = 30;

/// A hard-coded handler's output: edges on the dispatched resource itself,
/// plus edges destined for some other resource's relationship list, plus
/// (rarely — only the subnet handler uses this today) a direct field
/// update on the dispatched resource that isn't expressible as an edge.
#[derive(Default)]
pub struct HandlerOutput {
    pub own: Vec<Relationship>,
    pub cross: Vec<(ResourceId, Relationship)>,
    pub own_subnet_id: Option<String>,
}

impl HandlerOutput {
    fn of(own: Vec<Relationship>) -> Self {
        Self { own, cross: Vec::new(), own_subnet_id: None }
    }
}

pub async fn run(
    working_set: &mut Vec<Resource>,
    clients_by_key: &HashMap<(String, String), ClientSet>,
    maps: &LookupMaps,
) -> Vec<HandlerFailure> {
    let registry = schema::registry();
    let id_index: HashMap<ResourceId, usize> =
        working_set.iter().enumerate().map(|(i, r)| (r.id.clone(), i)).collect();

    let snapshots: Vec<(usize, Resource)> = working_set.iter().cloned().enumerate().collect();

    let results = stream::iter(snapshots)
        .map(|(index, resource)| {
            let clients = clients_by_key.get(&(resource.account_id.clone(), resource.region.clone()));
            let registry = &registry;
            async move {
                let mut own = schema::evaluate(&resource, registry, maps);
                let mut cross = Vec::new();
                let mut own_subnet_id = None;
                let mut failure = None;

                if let Some(clients) = clients {
                    match hard_coded::dispatch(&resource, clients, maps).await {
                        Ok(output) => {
                            own.extend(output.own);
                            cross.extend(output.cross);
                            own_subnet_id = output.own_subnet_id;
                        }
                        Err(err) => failure = Some(HandlerFailure::new(
                            "stage2",
                            &resource.account_id,
                            &resource.region,
                            err,
                        )),
                    }
                }
                (index, own, cross, own_subnet_id, failure)
            }
        })
        .buffer_unordered(CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut failures = Vec::new();
    let mut cross_patches = Vec::new();
    for (index, own, cross, own_subnet_id, failure) in results {
        working_set[index].relationships.extend(own);
        if let Some(subnet_id) = own_subnet_id {
            working_set[index].subnet_id = Some(subnet_id);
        }
        cross_patches.extend(cross);
        if let Some(f) = failure {
            failures.push(f);
        }
    }

    for (target_id, relationship) in cross_patches {
        if let Some(&index) = id_index.get(&target_id) {
            working_set[index].relationships.push(relationship);
        }
    }

    failures
}

mod hard_coded {
    use discovery_core::ids::{ResourceId, ResourceIdentifierKey};
    use discovery_core::relationship::Relationship;
    use discovery_core::resource::Resource;
    use discovery_provider::error::ProviderError;
    use serde_json::Value;

    use crate::client_set::ClientSet;
    use crate::inference::lookup_maps::LookupMaps;

    use super::HandlerOutput;

    pub async fn dispatch(
        resource: &Resource,
        clients: &ClientSet,
        maps: &LookupMaps,
    ) -> Result<HandlerOutput, ProviderError> {
        match resource.resource_type.as_str() {
            "AWS::ApiGateway::Method" => Ok(gateway_method(resource)),
            "AWS::ServiceCatalogAppRegistry::Tag" => Ok(HandlerOutput::default()),
            "AWS::ServiceCatalogAppRegistry::Application" => Ok(app_registry_application(resource)),
            "AWS::EC2::SecurityGroup" => Ok(security_group(resource)),
            "AWS::EC2::Subnet" => Ok(subnet(resource)),
            "AWS::EC2::NetworkInterface" => Ok(network_interface(resource, maps)),
            "AWS::EC2::RouteTable" => Ok(route_table(resource)),
            "AWS::RDS::DBInstance" => Ok(db_instance(resource)),
            "AWS::ECS::Task" => container_task(resource, clients, maps).await,
            "AWS::ECS::TaskDefinition" => Ok(task_definition(resource, maps)),
            "AWS::EKS::Nodegroup" => Ok(node_group(resource, maps)),
            "AWS::ElasticLoadBalancingV2::Listener" => Ok(elbv2_listener(resource, maps)),
            "AWS::ElasticLoadBalancingV2::TargetGroup" => target_group(resource, clients, maps).await,
            "AWS::Events::EventBus" => Ok(event_bus(resource, maps)),
            "AWS::IAM::Role" | "AWS::IAM::User" => identity(resource, clients).await,
            "AWS::IAM::InlinePolicy" => Ok(inline_policy(resource, maps)),
            "AWS::CloudFront::Distribution" | "AWS::CloudFront::StreamingDistribution" => {
                Ok(distribution(resource, maps))
            }
            _ => Ok(HandlerOutput::default()),
        }
    }

    /// Parses the integration URI API Gateway's proxy-Lambda pattern embeds
    /// (`.../functions/{lambda_arn}/invocations`) and emits the method's
    /// `associated-with` edge to that function.
    fn gateway_method(resource: &Resource) -> HandlerOutput {
        let Some(uri) = resource.configuration.get("integrationUri").and_then(Value::as_str) else {
            return HandlerOutput::default();
        };
        let Some(start) = uri.find("functions/") else {
            return HandlerOutput::default();
        };
        let rest = &uri[start + "functions/".len()..];
        let Some(end) = rest.find("/invocations") else {
            return HandlerOutput::default();
        };
        let function_arn = &rest[..end];
        HandlerOutput::of(vec![Relationship::new(
            resource.id.clone(),
            "ASSOCIATED_WITH",
            function_arn.to_string(),
        )])
    }

    /// Inherits the synthesized Tag resource's relationships renamed to
    /// `contains` — preserving the source's directionally-inconsistent
    /// rename rather than "fixing" it into a symmetrical edge.
    fn app_registry_application(resource: &Resource) -> HandlerOutput {
        let own = resource
            .relationships
            .iter()
            .filter(|r| r.label == "ASSOCIATED_WITH")
            .map(|r| Relationship::new(resource.id.clone(), "contains", r.target.clone()))
            .collect();
        HandlerOutput::of(own)
    }

    /// Dedups the security-group-to-security-group edges implied by
    /// ingress/egress rules that reference another group as their source or
    /// destination.
    fn security_group(resource: &Resource) -> HandlerOutput {
        let mut seen = std::collections::HashSet::new();
        let mut own = Vec::new();
        for field in ["IpPermissions", "IpPermissionsEgress"] {
            let Some(rules) = resource.configuration.get(field).and_then(Value::as_array) else { continue };
            for rule in rules {
                let Some(pairs) = rule.get("UserIdGroupPairs").and_then(Value::as_array) else { continue };
                for pair in pairs {
                    if let Some(group_id) = pair.get("GroupId").and_then(Value::as_str) {
                        if seen.insert(group_id.to_string()) {
                            own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", group_id.to_string()));
                        }
                    }
                }
            }
        }
        HandlerOutput::of(own)
    }

    /// Sets the subnet's own `subnetId` from its configuration (§4.7: "set
    /// `subnetId` from configuration"). `private` is derived separately
    /// from route-table shape by `compute_subnet_privacy`, and the
    /// `vpc_id`/`subnet_id` backfill for *other* resources that reference
    /// this subnet happens in the normalization post-pass, not here.
    fn subnet(resource: &Resource) -> HandlerOutput {
        let subnet_id = resource
            .configuration
            .get("SubnetId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(resource.resource_id.clone()));
        HandlerOutput { own_subnet_id: subnet_id, ..HandlerOutput::default() }
    }

    /// Routes each route's gateway id to a `CONTAINS` edge when it matches
    /// a recognizable NAT gateway, VPC endpoint, or internet gateway id
    /// prefix. A NAT route is carried in its own `NatGatewayId` field
    /// rather than `GatewayId` (§8 scenario 1), so both are checked.
    fn route_table(resource: &Resource) -> HandlerOutput {
        let Some(routes) = resource.configuration.get("Routes").and_then(Value::as_array) else {
            return HandlerOutput::default();
        };
        let mut own = Vec::new();
        for route in routes {
            if let Some(nat_gateway_id) = route.get("NatGatewayId").and_then(Value::as_str) {
                own.push(Relationship::new(resource.id.clone(), "CONTAINS", nat_gateway_id.to_string()));
                continue;
            }
            let Some(gateway_id) = route.get("GatewayId").and_then(Value::as_str) else { continue };
            if gateway_id.starts_with("nat-") || gateway_id.starts_with("vpce-") || gateway_id.starts_with("igw-") {
                own.push(Relationship::new(resource.id.clone(), "CONTAINS", gateway_id.to_string()));
            }
        }
        HandlerOutput::of(own)
    }

    /// Subnet-group AZ matching: associates the DB instance with the VPC its
    /// subnet group lives in, and with whichever subnet carries the
    /// instance's own availability zone.
    fn db_instance(resource: &Resource) -> HandlerOutput {
        let Some(group) = resource.configuration.get("DBSubnetGroup") else {
            return HandlerOutput::default();
        };
        let mut own = Vec::new();
        if let Some(vpc_id) = group.get("VpcId").and_then(Value::as_str) {
            own.push(Relationship::new(resource.id.clone(), "CONTAINED_IN", vpc_id.to_string()));
        }
        let instance_az = resource.availability_zone.as_deref();
        if let Some(subnets) = group.get("Subnets").and_then(Value::as_array) {
            for subnet in subnets {
                let subnet_az = subnet
                    .get("SubnetAvailabilityZone")
                    .and_then(|z| z.get("Name"))
                    .and_then(Value::as_str);
                if subnet_az.is_some() && subnet_az == instance_az {
                    if let Some(subnet_id) = subnet.get("SubnetIdentifier").and_then(Value::as_str) {
                        own.push(Relationship::new(resource.id.clone(), "CONTAINED_IN", subnet_id.to_string()));
                    }
                }
            }
        }
        HandlerOutput::of(own)
    }

    /// Associates the task with its cluster and role(s), resolves each
    /// container's environment variables, and — for every attached ENI —
    /// emits a cross edge marking that interface as attached to this task.
    async fn container_task(
        resource: &Resource,
        _clients: &ClientSet,
        maps: &LookupMaps,
    ) -> Result<HandlerOutput, ProviderError> {
        let mut own = Vec::new();
        let mut cross = Vec::new();

        if let Some(cluster_arn) = resource.configuration.get("ClusterArn").and_then(Value::as_str) {
            own.push(Relationship::new(resource.id.clone(), "CONTAINED_IN", cluster_arn.to_string()));
        }

        let task_role = resource
            .configuration
            .get("Overrides")
            .and_then(|o| o.get("TaskRoleArn"))
            .and_then(Value::as_str)
            .or_else(|| resource.configuration.get("TaskDefinitionTaskRoleArn").and_then(Value::as_str));
        if let Some(role_arn) = task_role {
            own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", role_arn.to_string()));
        }

        let known_ids: std::collections::HashSet<ResourceId> = std::iter::once(resource.id.clone()).collect();
        if let Some(containers) = resource.configuration.get("Containers").and_then(Value::as_array) {
            for container in containers {
                if let Some(env) = container.get("Environment").and_then(Value::as_array) {
                    for entry in env {
                        if let Some(value) = entry.get("Value").and_then(Value::as_str) {
                            if let Some(target) =
                                super::super::env_vars::resolve(value, &resource.account_id, &resource.region, &known_ids, maps)
                            {
                                own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", target));
                            }
                        }
                    }
                }
            }
        }

        if let Some(attachments) = resource.configuration.get("Attachments").and_then(Value::as_array) {
            for attachment in attachments {
                if attachment.get("Type").and_then(Value::as_str) != Some("ElasticNetworkInterface") {
                    continue;
                }
                let Some(details) = attachment.get("Details").and_then(Value::as_array) else { continue };
                let eni_id = details
                    .iter()
                    .find(|d| d.get("Name").and_then(Value::as_str) == Some("networkInterfaceId"))
                    .and_then(|d| d.get("Value"))
                    .and_then(Value::as_str);
                if let Some(eni_id) = eni_id {
                    if let Some(target) = maps.resource_identifier_to_id.iter().find_map(|entry| {
                        (entry.key().identifier == eni_id).then(|| entry.value().clone())
                    }) {
                        cross.push((target, Relationship::new(ResourceId::new(eni_id), "ATTACHED_TO", resource.id.clone())));
                    }
                }
            }
        }

        Ok(HandlerOutput { own, cross, own_subnet_id: None })
    }

    /// Resolves environment-variable edges for every container definition —
    /// the static task-definition template, rather than a running task's
    /// overrides.
    fn task_definition(resource: &Resource, maps: &LookupMaps) -> HandlerOutput {
        let known_ids = std::collections::HashSet::new();
        let mut own = Vec::new();
        let Some(containers) = resource.configuration.get("ContainerDefinitions").and_then(Value::as_array) else {
            return HandlerOutput::default();
        };
        for container in containers {
            let Some(env) = container.get("Environment").and_then(Value::as_array) else { continue };
            for entry in env {
                if let Some(value) = entry.get("Value").and_then(Value::as_str) {
                    if let Some(target) =
                        super::super::env_vars::resolve(value, &resource.account_id, &resource.region, &known_ids, maps)
                    {
                        own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", target));
                    }
                }
            }
        }
        HandlerOutput::of(own)
    }

    /// Associates the node group with each autoscaling group backing it.
    fn node_group(resource: &Resource, maps: &LookupMaps) -> HandlerOutput {
        let mut own = Vec::new();
        if let Some(names) = resource.configuration.get("AutoScalingGroupNames").and_then(Value::as_array) {
            for name in names.iter().filter_map(Value::as_str) {
                if let Some(asg_id) = maps.asg_name_to_resource_id.get(name) {
                    own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", asg_id.clone()));
                }
            }
        }
        HandlerOutput::of(own)
    }

    /// Associates the listener with its load balancer, and — reading
    /// `DefaultActions` — with every forwarded target group and any Cognito
    /// user pool used for authentication.
    fn elbv2_listener(resource: &Resource, maps: &LookupMaps) -> HandlerOutput {
        let mut own = Vec::new();
        if let Some(lb_arn) = resource.configuration.get("LoadBalancerArn").and_then(Value::as_str) {
            own.push(Relationship::new(resource.id.clone(), "CONTAINED_IN", lb_arn.to_string()));
        }
        if let Some(actions) = resource.configuration.get("DefaultActions").and_then(Value::as_array) {
            for action in actions {
                if let Some(tg_arn) = action.get("TargetGroupArn").and_then(Value::as_str) {
                    own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", tg_arn.to_string()));
                }
                if let Some(groups) = action.get("ForwardConfig").and_then(|f| f.get("TargetGroups")).and_then(Value::as_array) {
                    for group in groups {
                        if let Some(tg_arn) = group.get("TargetGroupArn").and_then(Value::as_str) {
                            own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", tg_arn.to_string()));
                        }
                    }
                }
                if let Some(pool_arn) = action
                    .get("AuthenticateCognitoConfig")
                    .and_then(|c| c.get("UserPoolArn"))
                    .and_then(Value::as_str)
                {
                    own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", pool_arn.to_string()));
                }
            }
        }
        let _ = maps;
        HandlerOutput::of(own)
    }

    /// Queries live target health, associating the target group with its
    /// VPC, every registered instance/IP target, and any autoscaling group
    /// known to back it.
    async fn target_group(
        resource: &Resource,
        clients: &ClientSet,
        maps: &LookupMaps,
    ) -> Result<HandlerOutput, ProviderError> {
        let mut own = Vec::new();
        if let Some(vpc_id) = resource.configuration.get("VpcId").and_then(Value::as_str) {
            own.push(Relationship::new(resource.id.clone(), "CONTAINED_IN", vpc_id.to_string()));
        }

        let health = clients
            .elbv2
            .describe_target_health(resource.id.as_str(), &clients.identity, &clients.region)
            .await?;
        for target in &health {
            own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", target.target_id.clone()));
        }

        if let Some(asg) = maps.target_group_to_asg.get(resource.id.as_str()) {
            own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", asg.asg_arn.clone()));
        }

        Ok(HandlerOutput::of(own))
    }

    /// `rules_for_bus` never panics on a bus with no rules (§9 open
    /// question) — this handler just forwards whatever it returns.
    fn event_bus(resource: &Resource, maps: &LookupMaps) -> HandlerOutput {
        let own = maps
            .rules_for_bus(resource.id.as_str())
            .into_iter()
            .map(|rule_id| Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", rule_id))
            .collect();
        HandlerOutput::of(own)
    }

    /// Attaches only `aws`-partition managed policies — customer-managed
    /// policies are already modeled as first-order resources with their own
    /// edge from the Tier-B enricher.
    async fn identity(resource: &Resource, clients: &ClientSet) -> Result<HandlerOutput, ProviderError> {
        let attached = if resource.resource_type == "AWS::IAM::Role" {
            clients.iam.list_attached_role_policies(&resource.resource_id, &clients.identity).await?
        } else {
            clients.iam.list_attached_user_policies(&resource.resource_id, &clients.identity).await?
        };
        let own = attached
            .into_iter()
            .filter(|p| p.policy_arn.starts_with("arn:aws:iam::aws:policy/"))
            .map(|p| Relationship::new(resource.id.clone(), "ATTACHED_TO", p.policy_arn))
            .collect();
        Ok(HandlerOutput::of(own))
    }

    /// Walks each policy statement's `Resource` field, trimming a trailing
    /// `/*` wildcard before resolving it against the working set.
    fn inline_policy(resource: &Resource, maps: &LookupMaps) -> HandlerOutput {
        let mut own = Vec::new();
        let Some(statements) = resource
            .configuration
            .get("Statement")
            .and_then(|s| if s.is_array() { s.as_array().cloned() } else { Some(vec![s.clone()]) })
        else {
            return HandlerOutput::default();
        };
        for statement in statements {
            let resources = match statement.get("Resource") {
                Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                Some(Value::String(s)) => vec![s.clone()],
                _ => Vec::new(),
            };
            for arn in resources {
                let trimmed = arn.strip_suffix("/*").unwrap_or(&arn);
                if maps
                    .resource_identifier_to_id
                    .iter()
                    .any(|entry| entry.value().as_str() == trimmed)
                {
                    own.push(Relationship::new(resource.id.clone(), "ATTACHED_TO", trimmed.to_string()));
                }
            }
        }
        HandlerOutput::of(own)
    }

    /// Pattern-matches the interface's description/type to decide what it's
    /// attached to — a NAT gateway, an ALB, a VPC endpoint, an OpenSearch
    /// domain, or a Lambda function's own ENI. An interface that matches
    /// none of these is simply left with no inferred owner.
    fn network_interface(resource: &Resource, maps: &LookupMaps) -> HandlerOutput {
        let description = resource.configuration.get("Description").and_then(Value::as_str).unwrap_or_default();
        let interface_type = resource.configuration.get("InterfaceType").and_then(Value::as_str).unwrap_or_default();

        let mut own = Vec::new();
        if interface_type == "nat_gateway" {
            if let Some(nat_id) = description.strip_prefix("Interface for NAT Gateway ") {
                own.push(Relationship::new(resource.id.clone(), "ATTACHED_TO", nat_id.trim().to_string()));
            }
        } else if description.starts_with("ELB ") {
            let lb_name = description.trim_start_matches("ELB ").trim();
            if let Some(entry) = maps.elb_dns_to_resource.iter().find(|e| e.key().contains(lb_name)) {
                own.push(Relationship::new(resource.id.clone(), "ATTACHED_TO", entry.value().resource_id.clone()));
            }
        } else if interface_type == "vpc_endpoint" {
            if let Some(endpoint_id) = description.strip_prefix("VPC Endpoint Interface ") {
                own.push(Relationship::new(resource.id.clone(), "ATTACHED_TO", endpoint_id.trim().to_string()));
            }
        } else if description.starts_with("ES ") {
            let domain_name = description.trim_start_matches("ES ").trim();
            let key = ResourceIdentifierKey {
                resource_type: "AWS::OpenSearch::Domain".to_string(),
                identifier: domain_name.to_string(),
                account_id: resource.account_id.clone(),
                region: resource.region.clone(),
            };
            if let Some(domain_id) = maps.resource_identifier_to_id.get(&key) {
                own.push(Relationship::new(resource.id.clone(), "ATTACHED_TO", domain_id.clone()));
            }
        } else if let Some(rest) = description.strip_prefix("AWS Lambda VPC ENI-") {
            // Format is `AWS Lambda VPC ENI-<function name>-<random suffix>`;
            // the function name itself may contain hyphens, so only the
            // trailing random suffix is split off.
            if let Some((function_name, _suffix)) = rest.rsplit_once('-') {
                let key = ResourceIdentifierKey {
                    resource_type: "AWS::Lambda::Function".to_string(),
                    identifier: function_name.to_string(),
                    account_id: resource.account_id.clone(),
                    region: resource.region.clone(),
                };
                if let Some(function_id) = maps.resource_identifier_to_id.get(&key) {
                    own.push(Relationship::new(resource.id.clone(), "ATTACHED_TO", function_id.clone()));
                }
            }
        }
        HandlerOutput::of(own)
    }

    /// Rewrites an S3-origin target ARN and resolves the distribution's
    /// custom origin domain against the ELB DNS lookup map.
    fn distribution(resource: &Resource, maps: &LookupMaps) -> HandlerOutput {
        let mut own = Vec::new();
        let Some(origins) = resource
            .configuration
            .get("DistributionConfig")
            .and_then(|c| c.get("Origins"))
            .and_then(|o| o.get("Items"))
            .and_then(Value::as_array)
        else {
            return HandlerOutput::default();
        };
        for origin in origins {
            if let Some(domain) = origin.get("DomainName").and_then(Value::as_str) {
                if domain.ends_with(".s3.amazonaws.com") || domain.contains(".s3-") {
                    let bucket = domain.split('.').next().unwrap_or_default();
                    own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", format!("arn:aws:s3:::{bucket}")));
                } else if let Some(entry) = maps.elb_dns_to_resource.get(domain) {
                    own.push(Relationship::new(resource.id.clone(), "ASSOCIATED_WITH", entry.resource_id.clone()));
                }
            }
        }
        HandlerOutput::of(own)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        fn make_route_table(id: &str, config: serde_json::Value) -> Resource {
            let mut rt = Resource::new(id, "111111111111", "us-east-1", "AWS::EC2::RouteTable", "rtb-1");
            rt.configuration = config;
            rt
        }

        #[test]
        fn route_table_emits_contains_edge_for_nat_gateway_id_field() {
            let rt = make_route_table(
                "arn:aws:ec2:r:a:route-table/rtb-1",
                json!({ "Routes": [{ "NatGatewayId": "nat-1" }] }),
            );
            let output = super::route_table(&rt);
            assert_eq!(output.own.len(), 1);
            assert_eq!(output.own[0].label, "CONTAINS");
            assert_eq!(output.own[0].target.as_str(), "nat-1");
        }

        #[test]
        fn route_table_ignores_routes_with_neither_gateway_field() {
            let rt = make_route_table("arn:aws:ec2:r:a:route-table/rtb-1", json!({ "Routes": [{ "DestinationCidrBlock": "10.0.0.0/16" }] }));
            assert!(super::route_table(&rt).own.is_empty());
        }

        #[test]
        fn subnet_sets_own_subnet_id_from_configuration() {
            let mut subnet = Resource::new("arn:aws:ec2:r:a:subnet/subnet-1", "111111111111", "us-east-1", "AWS::EC2::Subnet", "subnet-1");
            subnet.configuration = json!({ "SubnetId": "subnet-1" });
            let output = super::subnet(&subnet);
            assert_eq!(output.own_subnet_id.as_deref(), Some("subnet-1"));
        }

        #[test]
        fn network_interface_resolves_lambda_owner_by_parsing_description() {
            let maps = LookupMaps::default();
            maps.resource_identifier_to_id.insert(
                ResourceIdentifierKey {
                    resource_type: "AWS::Lambda::Function".to_string(),
                    identifier: "my-function".to_string(),
                    account_id: "111111111111".to_string(),
                    region: "us-east-1".to_string(),
                },
                ResourceId::new("arn:aws:lambda:us-east-1:111111111111:function:my-function"),
            );
            let mut eni = Resource::new("arn:aws:ec2:r:a:network-interface/eni-1", "111111111111", "us-east-1", "AWS::EC2::NetworkInterface", "eni-1");
            eni.configuration = json!({ "Description": "AWS Lambda VPC ENI-my-function-abcd1234" });

            let output = super::network_interface(&eni, &maps);
            assert_eq!(output.own.len(), 1);
            assert_eq!(output.own[0].label, "ATTACHED_TO");
            assert_eq!(output.own[0].target.as_str(), "arn:aws:lambda:us-east-1:111111111111:function:my-function");
        }

        #[test]
        fn network_interface_resolves_search_domain_owner() {
            let maps = LookupMaps::default();
            maps.resource_identifier_to_id.insert(
                ResourceIdentifierKey {
                    resource_type: "AWS::OpenSearch::Domain".to_string(),
                    identifier: "my-domain".to_string(),
                    account_id: "111111111111".to_string(),
                    region: "us-east-1".to_string(),
                },
                ResourceId::new("arn:aws:es:us-east-1:111111111111:domain/my-domain"),
            );
            let mut eni = Resource::new("arn:aws:ec2:r:a:network-interface/eni-2", "111111111111", "us-east-1", "AWS::EC2::NetworkInterface", "eni-2");
            eni.configuration = json!({ "Description": "ES my-domain" });

            let output = super::network_interface(&eni, &maps);
            assert_eq!(output.own.len(), 1);
            assert_eq!(output.own[0].target.as_str(), "arn:aws:es:us-east-1:111111111111:domain/my-domain");
        }

        #[test]
        fn network_interface_with_unrecognized_description_yields_no_edge() {
            let maps = LookupMaps::default();
            let mut eni = Resource::new("arn:aws:ec2:r:a:network-interface/eni-3", "111111111111", "us-east-1", "AWS::EC2::NetworkInterface", "eni-3");
            eni.configuration = json!({ "Description": "some unrelated interface" });

            let output = super::network_interface(&eni, &maps);
            assert!(output.own.is_empty());
        }
    }
}
