//! The environment-variable inference rule (§4.7), shared by the Stage-1
//! `functions` batch handler, the container-task hard-coded handler, and
//! the task-definition hard-coded handler.

use discovery_core::ids::ResourceId;

use super::lookup_maps::LookupMaps;

const SUPPRESSED_TYPE: &str = "AWS::S3::AccountPublicAccessBlock";

/// Resolves one environment-variable value to a resource id, or `None` if
/// nothing in the working set matches. Tries, in order: an exact ARN match
/// in `resource_ids`, then `resourceId`/`resourceName` (untyped), then the
/// endpoint map. A match against the account's own public-access-block
/// singleton is suppressed — `value` is frequently the account id itself,
/// and every account carries exactly one such resource.
pub fn resolve(
    value: &str,
    account_id: &str,
    region: &str,
    known_ids: &std::collections::HashSet<ResourceId>,
    maps: &LookupMaps,
) -> Option<ResourceId> {
    if value.is_empty() {
        return None;
    }

    let candidate = if known_ids.contains(&ResourceId::new(value)) {
        Some(ResourceId::new(value))
    } else {
        maps.resolve_env_var_identifier(value, account_id, region)
            .or_else(|| maps.endpoint_to_id.get(value).map(|e| e.clone()))
    }?;

    if is_suppressed_public_access_block(&candidate, value, account_id, maps) {
        return None;
    }
    Some(candidate)
}

/// `true` when `candidate` resolves to the crawling account's own
/// `AWS::S3::AccountPublicAccessBlock` singleton, keyed by `resourceId ==
/// accountId` — the one case the rule explicitly suppresses.
fn is_suppressed_public_access_block(candidate: &ResourceId, raw_value: &str, account_id: &str, maps: &LookupMaps) -> bool {
    if raw_value != account_id {
        return false;
    }
    maps.resource_identifier_to_id
        .iter()
        .any(|entry| entry.value() == candidate && entry.key().resource_type == SUPPRESSED_TYPE && entry.key().identifier == account_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::ids::ResourceIdentifierKey;
    use std::collections::HashSet;

    #[test]
    fn exact_arn_in_working_set_resolves_directly() {
        let maps = LookupMaps::default();
        let mut known = HashSet::new();
        known.insert(ResourceId::new("arn:aws:rds:us-east-1:111111111111:db:mydb"));
        let resolved = resolve(
            "arn:aws:rds:us-east-1:111111111111:db:mydb",
            "111111111111",
            "us-east-1",
            &known,
            &maps,
        );
        assert_eq!(resolved, Some(ResourceId::new("arn:aws:rds:us-east-1:111111111111:db:mydb")));
    }

    #[test]
    fn account_id_matching_public_access_block_is_suppressed() {
        let maps = LookupMaps::default();
        let block_id = ResourceId::new("arn:aws:s3:::account-public-access-block/111111111111");
        maps.resource_identifier_to_id.insert(
            ResourceIdentifierKey {
                resource_type: SUPPRESSED_TYPE.to_string(),
                identifier: "111111111111".to_string(),
                account_id: "111111111111".to_string(),
                region: "global".to_string(),
            },
            block_id.clone(),
        );
        maps.env_var_identifier_to_id.insert(
            discovery_core::ids::UntypedIdentifierKey {
                identifier: "111111111111".to_string(),
                account_id: "111111111111".to_string(),
                region: "us-east-1".to_string(),
            },
            block_id,
        );
        let known = HashSet::new();
        let resolved = resolve("111111111111", "111111111111", "us-east-1", &known, &maps);
        assert_eq!(resolved, None);
    }
}
