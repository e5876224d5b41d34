//! The schema-driven half of Stage 2: resource types declare
//! `RelationshipDescriptor`s evaluated with a JMESPath expression over
//! their (or a fetched response's) configuration.
//!
//! Only a handful of resource types get schema-driven descriptors here —
//! the spec calls the hard-coded handler list "illustrative, not
//! exhaustive" but is silent on which types actually use descriptors
//! rather than bespoke code, so this registry covers the simple
//! single-field-to-ARN cases a descriptor is suited for and leaves the
//! handlers with real fan-out (target health, subnet AZ lookups) as
//! hard-coded handlers in `stage2.rs`.

use std::collections::HashMap;

use discovery_core::ids::ResourceId;
use discovery_core::relationship::{IdentifierType, Relationship, RelationshipDescriptor};
use discovery_core::resource::Resource;

use super::lookup_maps::LookupMaps;

fn descriptor(relationship_name: &str, identifier_type: IdentifierType, path: &str) -> RelationshipDescriptor {
    RelationshipDescriptor {
        relationship_name: relationship_name.to_string(),
        resource_type: None,
        identifier_type,
        identifier_value: path.to_string(),
        account_id: None,
        region: None,
        rel_name_suffix: None,
    }
}

/// Resource type → descriptors declared for it. Built fresh per call since
/// it's a small, static table — cheaper than sharing it behind a `OnceLock`
/// for the handful of lookups stage 2 performs per crawl.
pub fn registry() -> HashMap<&'static str, Vec<RelationshipDescriptor>> {
    let mut map = HashMap::new();
    map.insert(
        "AWS::Lambda::Function",
        vec![descriptor("ASSOCIATED_WITH", IdentifierType::Arn, "Role")],
    );
    map.insert(
        "AWS::ECS::TaskDefinition",
        vec![
            descriptor("ASSOCIATED_WITH", IdentifierType::Arn, "TaskRoleArn"),
            descriptor("ASSOCIATED_WITH", IdentifierType::Arn, "ExecutionRoleArn"),
        ],
    );
    map.insert(
        "AWS::EC2::Instance",
        vec![descriptor("ASSOCIATED_WITH", IdentifierType::Arn, "IamInstanceProfile.Arn")],
    );
    map.insert(
        "AWS::DynamoDB::Table",
        vec![descriptor(
            "ASSOCIATED_WITH",
            IdentifierType::Arn,
            "SSEDescription.KMSMasterKeyArn",
        )],
    );
    map
}

/// Evaluates every descriptor registered for `resource.resource_type`
/// against `resource.configuration`, producing resolved relationships.
/// Non-nil results are flattened (JMESPath queries can return nested
/// arrays); `endpoint`-typed results are remapped through `endpoint_to_id`
/// before being treated as a resource id.
pub fn evaluate(
    resource: &Resource,
    registry: &HashMap<&'static str, Vec<RelationshipDescriptor>>,
    maps: &LookupMaps,
) -> Vec<Relationship> {
    let Some(descriptors) = registry.get(resource.resource_type.as_str()) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for descriptor in descriptors {
        let Ok(expr) = jmespath::compile(&descriptor.identifier_value) else {
            continue;
        };
        let Ok(result) = expr.search(resource.configuration.clone()) else {
            continue;
        };

        for value in flatten_strings(&result) {
            let target = match descriptor.identifier_type {
                IdentifierType::Endpoint => match maps.endpoint_to_id.get(&value) {
                    Some(entry) => entry.clone(),
                    None => continue,
                },
                _ => ResourceId::new(value),
            };
            let name = match &descriptor.rel_name_suffix {
                Some(suffix) => format!("{}{}", descriptor.relationship_name, suffix),
                None => descriptor.relationship_name.clone(),
            };
            out.push(Relationship::new(resource.id.clone(), name, target));
        }
    }
    out
}

fn flatten_strings(var: &jmespath::Variable) -> Vec<String> {
    match var {
        jmespath::Variable::String(s) if !s.is_empty() => vec![s.clone()],
        jmespath::Variable::Array(items) => items.iter().flat_map(|v| flatten_strings(v)).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lambda_role_descriptor_resolves_to_an_arn_edge() {
        let mut function = Resource::new(
            "arn:aws:lambda:us-east-1:111111111111:function:f1",
            "111111111111",
            "us-east-1",
            "AWS::Lambda::Function",
            "f1",
        );
        function.configuration = json!({ "Role": "arn:aws:iam::111111111111:role/exec" });

        let registry = registry();
        let maps = LookupMaps::default();
        let rels = evaluate(&function, &registry, &maps);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].target.as_str(), "arn:aws:iam::111111111111:role/exec");
    }

    #[test]
    fn unregistered_type_yields_no_relationships() {
        let resource = Resource::new("arn:a", "111111111111", "us-east-1", "AWS::S3::Bucket", "b");
        let registry = registry();
        let maps = LookupMaps::default();
        assert!(evaluate(&resource, &registry, &maps).is_empty());
    }
}
