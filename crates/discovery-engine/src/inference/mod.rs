//! The relationship inference engine (§4.7): stage 1 (batched, per
//! account/region), stage 2 (per-resource, schema-driven + hard-coded),
//! then two working-set-wide post-passes — relationship-name normalization
//! and VPC info backfill — that need every resource resolved before they
//! can run.

pub mod env_vars;
pub mod lookup_maps;
pub mod schema;
pub mod stage1;
pub mod stage2;

use std::collections::{HashMap, HashSet};

use discovery_core::constants::{is_in_normalization_set, normalization_suffix};
use discovery_core::ids::ResourceId;
use discovery_core::relationship::Relationship;
use discovery_core::resource::Resource;

use crate::client_set::ClientSet;
use crate::enrichment::HandlerFailure;

use lookup_maps::LookupMaps;

/// Runs the full inference pass over `working_set` in place: stage 1,
/// stage 2, then the normalization and VPC-backfill post-passes, strictly
/// in that order. The lookup maps are built once, up front, from the
/// working set stage 1 and stage 2 start with — stage 2 handlers that add
/// edges never invalidate a map another handler already consulted.
pub async fn run(
    working_set: &mut Vec<Resource>,
    clients_by_key: &HashMap<(String, String), ClientSet>,
) -> Vec<HandlerFailure> {
    let maps = LookupMaps::build(working_set);

    let mut failures = stage1::run(working_set, clients_by_key, &maps).await;
    failures.extend(stage2::run(working_set, clients_by_key, &maps).await);

    normalize_relationship_names(working_set);
    backfill_vpc_info(working_set);

    failures
}

/// Maps a resolved target's `resourceType` onto the short type label the
/// normalization set is keyed by. Types outside this list never qualify,
/// no matter how the edge is labeled.
fn normalization_type_label(resource_type: &str) -> Option<&'static str> {
    match resource_type {
        "AWS::EC2::Instance" => Some("instance"),
        "AWS::EC2::NetworkInterface" => Some("network-interface"),
        "AWS::EC2::SecurityGroup" => Some("security-group"),
        "AWS::EC2::Subnet" => Some("subnet"),
        "AWS::EC2::Volume" => Some("volume"),
        "AWS::EC2::VPC" => Some("VPC"),
        "AWS::IAM::Role" => Some("role"),
        _ => None,
    }
}

/// Appends a qualifying suffix to every relationship whose target's type
/// is in the normalization set and whose name doesn't already carry that
/// qualifier, e.g. `ASSOCIATED_WITH` pointing at a subnet becomes
/// `ASSOCIATED_WITH_SUBNET`.
fn normalize_relationship_names(working_set: &mut [Resource]) {
    let type_by_id: HashMap<ResourceId, String> =
        working_set.iter().map(|r| (r.id.clone(), r.resource_type.clone())).collect();

    for resource in working_set.iter_mut() {
        for rel in resource.relationships.iter_mut() {
            if rel.is_unresolved() {
                continue;
            }
            let Some(target_type) = type_by_id.get(&rel.target) else { continue };
            let Some(label) = normalization_type_label(target_type) else { continue };
            if !is_in_normalization_set(label) {
                continue;
            }
            let Some(suffix) = normalization_suffix(label) else { continue };
            let qualifier = suffix.to_uppercase();
            if !rel.label.ends_with(&qualifier) {
                rel.label = format!("{}_{}", rel.label, qualifier);
            }
        }
    }
}

const EXCLUDED_FROM_VPC_BACKFILL: &[&str] = &[
    "AWS::Tags::Tag",
    "AWS::Config::ResourceCompliance",
    "AWS::CloudFormation::Stack",
];

/// Backfills `vpcId`, `subnetId`, `availabilityZone`, and (for subnets
/// only) `private` from each resource's already-resolved relationships.
/// Runs after normalization so the `_VPC`/`_SUBNET` qualifiers are already
/// in place, though this pass matches on target type rather than label
/// suffix so it isn't order-dependent on that.
fn backfill_vpc_info(working_set: &mut [Resource]) {
    let type_of: HashMap<ResourceId, String> =
        working_set.iter().map(|r| (r.id.clone(), r.resource_type.clone())).collect();
    let az_of: HashMap<ResourceId, String> = working_set
        .iter()
        .filter_map(|r| r.availability_zone.clone().map(|az| (r.id.clone(), az)))
        .collect();

    // Subnet -> its own VPC, read from the subnet's own relationships
    // rather than re-derived here, so a subnet's membership is available
    // to backfill resources attached to it regardless of iteration order.
    let subnet_vpc: HashMap<ResourceId, ResourceId> = working_set
        .iter()
        .filter(|r| r.resource_type == "AWS::EC2::Subnet")
        .filter_map(|r| {
            r.relationships
                .iter()
                .find(|rel| !rel.is_unresolved() && type_of.get(&rel.target).map(String::as_str) == Some("AWS::EC2::VPC"))
                .map(|rel| (r.id.clone(), rel.target.clone()))
        })
        .collect();

    let subnet_private = compute_subnet_privacy(working_set);

    for resource in working_set.iter_mut() {
        if EXCLUDED_FROM_VPC_BACKFILL.contains(&resource.resource_type.as_str()) {
            continue;
        }

        if resource.resource_type == "AWS::EC2::Subnet" {
            resource.private = subnet_private.get(&resource.id).copied();
        }

        let mut vpc_edge: Option<ResourceId> = None;
        let mut subnet_ids: Vec<ResourceId> = Vec::new();
        for rel in &resource.relationships {
            if rel.is_unresolved() {
                continue;
            }
            match type_of.get(&rel.target).map(String::as_str) {
                Some("AWS::EC2::VPC") => vpc_edge = Some(rel.target.clone()),
                Some("AWS::EC2::Subnet") if rel.label != "CONTAINS" && rel.label != "CONTAINS_SUBNET" => {
                    subnet_ids.push(rel.target.clone())
                }
                _ => {}
            }
        }

        if let Some(vpc_id) = &vpc_edge {
            resource.vpc_id = Some(vpc_id.as_str().to_string());
        }

        if !subnet_ids.is_empty() {
            let mut azs: Vec<String> = subnet_ids.iter().filter_map(|id| az_of.get(id).cloned()).collect();
            azs.sort();
            azs.dedup();
            if !azs.is_empty() {
                resource.availability_zone = Some(azs.join(","));
            }
            if let [only] = subnet_ids.as_slice() {
                resource.subnet_id = Some(only.as_str().to_string());
            }
        }

        if vpc_edge.is_none() && !subnet_ids.is_empty() {
            let vpcs: HashSet<&ResourceId> = subnet_ids.iter().filter_map(|id| subnet_vpc.get(id)).collect();
            if let [common] = vpcs.into_iter().collect::<Vec<_>>().as_slice() {
                let common = (*common).clone();
                resource.vpc_id = Some(common.as_str().to_string());
                resource.relationships.push(Relationship::new(resource.id.clone(), "CONTAINED_IN_VPC", common));
            }
        }
    }
}

/// A subnet is private iff its associated route table has no route
/// targeting a NAT gateway. A subnet with no explicit association falls
/// back to its VPC's main route table; a subnet resolving to no route
/// table at all is left with `private = None` rather than a guess.
fn compute_subnet_privacy(working_set: &[Resource]) -> HashMap<ResourceId, bool> {
    let mut main_table_by_vpc: HashMap<String, bool> = HashMap::new();
    let mut table_by_subnet: HashMap<String, bool> = HashMap::new();

    for resource in working_set {
        if resource.resource_type != "AWS::EC2::RouteTable" {
            continue;
        }
        let has_nat = resource
            .configuration
            .get("Routes")
            .and_then(|v| v.as_array())
            .map(|routes| {
                routes.iter().any(|route| {
                    route.get("NatGatewayId").and_then(|v| v.as_str()).is_some()
                        || route.get("GatewayId").and_then(|v| v.as_str()).is_some_and(|id| id.starts_with("nat-"))
                })
            })
            .unwrap_or(false);

        let Some(associations) = resource.configuration.get("Associations").and_then(|v| v.as_array()) else {
            continue;
        };
        for association in associations {
            if let Some(subnet_id) = association.get("SubnetId").and_then(|v| v.as_str()) {
                table_by_subnet.insert(subnet_id.to_string(), has_nat);
            } else if association.get("Main").and_then(|v| v.as_bool()) == Some(true) {
                if let Some(vpc_id) = resource.configuration.get("VpcId").and_then(|v| v.as_str()) {
                    main_table_by_vpc.insert(vpc_id.to_string(), has_nat);
                }
            }
        }
    }

    let mut out = HashMap::new();
    for resource in working_set {
        if resource.resource_type != "AWS::EC2::Subnet" {
            continue;
        }
        let has_nat = if let Some(has_nat) = table_by_subnet.get(resource.resource_id.as_str()) {
            Some(*has_nat)
        } else {
            resource
                .configuration
                .get("VpcId")
                .and_then(|v| v.as_str())
                .and_then(|vpc_id| main_table_by_vpc.get(vpc_id))
                .copied()
        };
        if let Some(has_nat) = has_nat {
            out.insert(resource.id.clone(), !has_nat);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::resource::Resource;
    use serde_json::json;

    fn vpc(id: &str) -> Resource {
        Resource::new(id, "111111111111", "us-east-1", "AWS::EC2::VPC", id)
    }

    fn subnet_with_route_table(id: &str, resource_id: &str, vpc_id: &str, route_tables: &mut Vec<Resource>, has_nat: bool) -> Resource {
        let mut s = Resource::new(id, "111111111111", "us-east-1", "AWS::EC2::Subnet", resource_id);
        s.configuration = json!({ "VpcId": vpc_id });
        s.relationships.push(Relationship::new(s.id.clone(), "CONTAINED_IN", vpc_id.to_string()));

        let rt_id = format!("rtb-{resource_id}");
        let mut rt = Resource::new(format!("arn:aws:ec2:r:a:route-table/{rt_id}"), "111111111111", "us-east-1", "AWS::EC2::RouteTable", &rt_id);
        let route = if has_nat { json!({ "NatGatewayId": "nat-0123" }) } else { json!({ "GatewayId": "igw-0123" }) };
        rt.configuration = json!({
            "Routes": [route],
            "Associations": [{ "SubnetId": resource_id }],
        });
        route_tables.push(rt);
        s
    }

    #[test]
    fn normalization_appends_qualifier_exactly_once() {
        let mut working_set = vec![vpc("arn:aws:ec2:r:a:vpc/vpc-1")];
        let mut instance = Resource::new("arn:aws:ec2:r:a:instance/i-1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1");
        instance.relationships.push(Relationship::new(instance.id.clone(), "ASSOCIATED_WITH", "arn:aws:ec2:r:a:vpc/vpc-1"));
        working_set.push(instance);

        normalize_relationship_names(&mut working_set);

        let rel = &working_set[1].relationships[0];
        assert_eq!(rel.label, "ASSOCIATED_WITH_VPC");
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut working_set = vec![vpc("arn:aws:ec2:r:a:vpc/vpc-1")];
        let mut instance = Resource::new("arn:aws:ec2:r:a:instance/i-1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1");
        instance.relationships.push(Relationship::new(instance.id.clone(), "ASSOCIATED_WITH_VPC", "arn:aws:ec2:r:a:vpc/vpc-1"));
        working_set.push(instance);

        normalize_relationship_names(&mut working_set);

        assert_eq!(working_set[1].relationships[0].label, "ASSOCIATED_WITH_VPC");
    }

    #[test]
    fn vpc_backfill_derives_vpc_id_and_subnet_id_from_edges() {
        let mut route_tables = Vec::new();
        let subnet = subnet_with_route_table(
            "arn:aws:ec2:r:a:subnet/subnet-1",
            "subnet-1",
            "vpc-1",
            &mut route_tables,
            false,
        );

        let mut instance = Resource::new("arn:aws:ec2:r:a:instance/i-1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1");
        instance
            .relationships
            .push(Relationship::new(instance.id.clone(), "CONTAINED_IN", subnet.id.clone()));

        let mut working_set = vec![vpc("vpc-1"), subnet, instance];
        working_set.extend(route_tables);

        backfill_vpc_info(&mut working_set);

        let instance = working_set.iter().find(|r| r.resource_type == "AWS::EC2::Instance").unwrap();
        assert_eq!(instance.subnet_id.as_deref(), Some("arn:aws:ec2:r:a:subnet/subnet-1"));
        assert_eq!(instance.vpc_id.as_deref(), Some("vpc-1"));
    }

    #[test]
    fn subnet_with_nat_route_is_marked_public() {
        let mut route_tables = Vec::new();
        let subnet = subnet_with_route_table("arn:aws:ec2:r:a:subnet/subnet-1", "subnet-1", "vpc-1", &mut route_tables, true);
        let mut working_set = vec![vpc("vpc-1"), subnet];
        working_set.extend(route_tables);

        backfill_vpc_info(&mut working_set);

        let subnet = working_set.iter().find(|r| r.resource_type == "AWS::EC2::Subnet").unwrap();
        assert_eq!(subnet.private, Some(false));
    }

    #[test]
    fn subnet_with_no_nat_route_is_marked_private() {
        let mut route_tables = Vec::new();
        let subnet = subnet_with_route_table("arn:aws:ec2:r:a:subnet/subnet-1", "subnet-1", "vpc-1", &mut route_tables, false);
        let mut working_set = vec![vpc("vpc-1"), subnet];
        working_set.extend(route_tables);

        backfill_vpc_info(&mut working_set);

        let subnet = working_set.iter().find(|r| r.resource_type == "AWS::EC2::Subnet").unwrap();
        assert_eq!(subnet.private, Some(true));
    }
}
