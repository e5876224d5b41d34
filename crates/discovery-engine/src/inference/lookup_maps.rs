//! The inferencer's lookup maps (§4.7), built once per crawl and read
//! concurrently by stage 2's concurrency-30 fan-out. `dashmap::DashMap` is
//! used purely for safe concurrent *reads* here — every map is fully
//! populated before stage 2 starts, so there's no concurrent-write
//! contention to worry about, just cheap shared access.

use dashmap::DashMap;
use serde_json::Value;

use discovery_core::ids::{ResourceId, ResourceIdentifierKey, UntypedIdentifierKey};
use discovery_core::resource::Resource;

#[derive(Debug, Clone)]
pub struct ElbDnsEntry {
    pub resource_id: ResourceId,
    pub resource_type: String,
    pub region: String,
}

#[derive(Debug, Clone, Default)]
pub struct TargetGroupAsg {
    pub asg_arn: ResourceId,
    pub instance_ids: std::collections::HashSet<String>,
}

/// Every lookup map the schema-driven and hard-coded inference handlers
/// resolve descriptors and environment variables against.
#[derive(Default)]
pub struct LookupMaps {
    pub resource_identifier_to_id: DashMap<ResourceIdentifierKey, ResourceId>,
    pub env_var_identifier_to_id: DashMap<UntypedIdentifierKey, ResourceId>,
    pub endpoint_to_id: DashMap<String, ResourceId>,
    pub elb_dns_to_resource: DashMap<String, ElbDnsEntry>,
    pub target_group_to_asg: DashMap<String, TargetGroupAsg>,
    pub asg_name_to_resource_id: DashMap<String, ResourceId>,
    pub event_bus_rule_map: DashMap<String, Vec<ResourceId>>,
}

impl LookupMaps {
    /// Builds every lookup map in one pass over the working set.
    pub fn build(working_set: &[Resource]) -> Self {
        let maps = Self::default();

        for resource in working_set {
            maps.resource_identifier_to_id.insert(
                ResourceIdentifierKey {
                    resource_type: resource.resource_type.clone(),
                    identifier: resource.resource_id.clone(),
                    account_id: resource.account_id.clone(),
                    region: resource.region.clone(),
                },
                resource.id.clone(),
            );
            if let Some(name) = &resource.resource_name {
                maps.resource_identifier_to_id.insert(
                    ResourceIdentifierKey {
                        resource_type: resource.resource_type.clone(),
                        identifier: name.clone(),
                        account_id: resource.account_id.clone(),
                        region: resource.region.clone(),
                    },
                    resource.id.clone(),
                );
            }

            let untyped = UntypedIdentifierKey {
                identifier: resource.resource_id.clone(),
                account_id: resource.account_id.clone(),
                region: resource.region.clone(),
            };
            maps.env_var_identifier_to_id.insert(untyped, resource.id.clone());
            if let Some(name) = &resource.resource_name {
                maps.env_var_identifier_to_id.insert(
                    UntypedIdentifierKey {
                        identifier: name.clone(),
                        account_id: resource.account_id.clone(),
                        region: resource.region.clone(),
                    },
                    resource.id.clone(),
                );
            }

            collect_endpoints(&resource.configuration, resource.id.clone(), &maps.endpoint_to_id);

            if resource.resource_type == "AWS::OpenSearch::Domain" {
                if let Some(endpoint) = resource.supplementary_configuration.get("endpoint").and_then(Value::as_str) {
                    maps.endpoint_to_id.insert(endpoint.to_string(), resource.id.clone());
                }
            }
            if resource.resource_type == "AWS::EKS::Cluster" {
                if let Some(endpoint) = resource.configuration.get("endpoint").and_then(Value::as_str) {
                    maps.endpoint_to_id.insert(endpoint.to_string(), resource.id.clone());
                }
            }

            if resource.resource_type == "AWS::ElasticLoadBalancingV2::LoadBalancer" {
                if let Some(dns) = resource.configuration.get("DNSName").and_then(Value::as_str) {
                    maps.elb_dns_to_resource.insert(
                        dns.to_string(),
                        ElbDnsEntry {
                            resource_id: resource.id.clone(),
                            resource_type: resource.resource_type.clone(),
                            region: resource.region.clone(),
                        },
                    );
                }
            }

            if resource.resource_type == "AWS::AutoScaling::AutoScalingGroup" {
                maps.asg_name_to_resource_id.insert(resource.resource_id.clone(), resource.id.clone());
                if let Some(arns) = resource.configuration.get("TargetGroupARNs").and_then(Value::as_array) {
                    let instance_ids: std::collections::HashSet<String> = resource
                        .configuration
                        .get("Instances")
                        .and_then(Value::as_array)
                        .map(|instances| {
                            instances
                                .iter()
                                .filter_map(|i| i.get("InstanceId").and_then(Value::as_str))
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                    for arn in arns {
                        if let Some(arn) = arn.as_str() {
                            maps.target_group_to_asg.insert(
                                arn.to_string(),
                                TargetGroupAsg {
                                    asg_arn: resource.id.clone(),
                                    instance_ids: instance_ids.clone(),
                                },
                            );
                        }
                    }
                }
            }

            if resource.resource_type == "AWS::Events::Rule" {
                if let Some(bus_arn) = resource.configuration.get("EventBusArn").and_then(Value::as_str) {
                    maps.event_bus_rule_map
                        .entry(bus_arn.to_string())
                        .or_default()
                        .push(resource.id.clone());
                }
            }
        }

        maps
    }

    /// Resolves a bare `(accountId, region, resourceId|resourceName)`
    /// reference for environment-variable inference, without the
    /// resource-type component that `resource_identifier_to_id` requires.
    pub fn resolve_env_var_identifier(&self, identifier: &str, account_id: &str, region: &str) -> Option<ResourceId> {
        self.env_var_identifier_to_id
            .get(&UntypedIdentifierKey {
                identifier: identifier.to_string(),
                account_id: account_id.to_string(),
                region: region.to_string(),
            })
            .map(|entry| entry.clone())
    }

    /// A missing bus in `event_bus_rule_map` resolves to an empty
    /// sequence rather than panicking — the spec's own source
    /// dereferences this unconditionally and would fail on a bus with no
    /// rules (§9 Open Questions); this is the documented fix.
    pub fn rules_for_bus(&self, bus_arn: &str) -> Vec<ResourceId> {
        self.event_bus_rule_map
            .get(bus_arn)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }
}

/// Walks a JSON configuration tree looking for any key named `endpoint`,
/// `Endpoint`, or ending in `.value`/`.address` (case-insensitively) and
/// maps the string value found there to `resource_id`.
fn collect_endpoints(value: &Value, resource_id: ResourceId, map: &DashMap<String, ResourceId>) {
    match value {
        Value::Object(obj) => {
            for (key, v) in obj {
                let key_lower = key.to_lowercase();
                if (key_lower == "endpoint" || key_lower.ends_with("value") || key_lower.ends_with("address")) {
                    if let Some(s) = v.as_str() {
                        if !s.is_empty() {
                            map.insert(s.to_string(), resource_id.clone());
                        }
                    }
                }
                collect_endpoints(v, resource_id.clone(), map);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_endpoints(item, resource_id.clone(), map);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_bus_resolves_to_empty_sequence() {
        let maps = LookupMaps::default();
        assert!(maps.rules_for_bus("arn:aws:events:us-east-1:111111111111:event-bus/custom").is_empty());
    }

    #[test]
    fn collects_nested_endpoint_fields() {
        let map = DashMap::new();
        let config = json!({
            "cluster": { "Endpoint": "https://cluster.example" },
            "nested": [{ "endpoint": "https://nested.example" }],
        });
        collect_endpoints(&config, ResourceId::new("arn:1"), &map);
        assert_eq!(map.get("https://cluster.example").map(|e| e.clone()), Some(ResourceId::new("arn:1")));
        assert_eq!(map.get("https://nested.example").map(|e| e.clone()), Some(ResourceId::new("arn:1")));
    }

    #[test]
    fn target_group_to_asg_carries_instance_membership() {
        let mut asg = Resource::new(
            "arn:aws:autoscaling:us-east-1:111111111111:autoScalingGroup:id:autoScalingGroupName/my-asg",
            "111111111111",
            "us-east-1",
            "AWS::AutoScaling::AutoScalingGroup",
            "my-asg",
        );
        asg.configuration = json!({
            "TargetGroupARNs": ["arn:aws:elasticloadbalancing:us-east-1:111111111111:targetgroup/tg/abc"],
            "Instances": [{"InstanceId": "i-1"}, {"InstanceId": "i-2"}],
        });
        let maps = LookupMaps::build(&[asg]);
        let entry = maps
            .target_group_to_asg
            .get("arn:aws:elasticloadbalancing:us-east-1:111111111111:targetgroup/tg/abc")
            .unwrap();
        assert_eq!(entry.instance_ids.len(), 2);
    }
}
