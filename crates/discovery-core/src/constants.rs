//! Fixed sets referenced throughout the pipeline.
//!
//! `HASH_SET` and `NORMALIZATION_SET` are closed vocabularies defined by the
//! specification, not configuration — they never change at runtime.

/// Sentinel region for global resources (identity, managed policies, tags).
pub const GLOBAL_REGION: &str = "global";

/// Sentinel target for an edge whose endpoint could not be resolved.
/// Edges carrying this target are never persisted.
pub const UNKNOWN_TARGET: &str = "unknown";

/// Resource types whose change detection uses `md5Hash` rather than
/// `configurationItemCaptureTime`. Matches the "hash set" in the glossary.
const HASH_SET: &[&str] = &[
    "AWS::ApiGateway::Method",
    "AWS::ApiGateway::Resource",
    "AWS::DynamoDB::Stream",
    "AWS::ECS::Task",
    "AWS::ElasticLoadBalancingV2::Listener",
    "AWS::EKS::NodeGroup",
    "AWS::ElasticLoadBalancingV2::TargetGroup",
    "AWS::IAM::ManagedPolicy",
    "AWS::EC2::SpotInstanceRequest",
    "AWS::EC2::SpotFleetRequest",
    "AWS::IAM::InlinePolicy",
    "AWS::Cognito::UserPool",
    "AWS::OpenSearch::Domain",
];

/// Relationship-target types that receive a qualifying suffix during
/// relationship-name normalization (§4.7 post-pass).
const NORMALIZATION_SET: &[&str] = &[
    "instance",
    "network-interface",
    "security-group",
    "subnet",
    "volume",
    "VPC",
    "role",
];

pub fn is_in_hash_set(resource_type: &str) -> bool {
    HASH_SET.contains(&resource_type)
}

pub fn is_in_normalization_set(type_label: &str) -> bool {
    NORMALIZATION_SET.contains(&type_label)
}

/// Camel-cased qualifier suffix used by relationship-name normalization.
/// Every entry in `NORMALIZATION_SET` maps to one of these except `VPC`,
/// which is special-cased to stay upper-case.
pub fn normalization_suffix(type_label: &str) -> Option<&'static str> {
    match type_label {
        "instance" => Some("Instance"),
        "network-interface" => Some("NetworkInterface"),
        "security-group" => Some("SecurityGroup"),
        "subnet" => Some("Subnet"),
        "volume" => Some("Volume"),
        "VPC" => Some("VPC"),
        "role" => Some("Role"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_set_contains_elbv2_target_group_but_not_instance() {
        assert!(is_in_hash_set("AWS::ElasticLoadBalancingV2::TargetGroup"));
        assert!(!is_in_hash_set("AWS::EC2::Instance"));
    }

    #[test]
    fn normalization_set_special_cases_vpc() {
        assert!(is_in_normalization_set("VPC"));
        assert_eq!(normalization_suffix("VPC"), Some("VPC"));
        assert_eq!(normalization_suffix("subnet"), Some("Subnet"));
        assert_eq!(normalization_suffix("unrelated"), None);
    }
}
