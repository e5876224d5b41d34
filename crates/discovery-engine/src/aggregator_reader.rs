//! Pulls the baseline resource set for every tracked account/region from
//! the cross-account configuration aggregator (§4.5).

use discovery_core::account::AccountsMap;
use discovery_core::resource::{Resource, Tag};
use discovery_provider::clients::config_service::ConfigServiceClient;
use discovery_provider::retry::{aggregator_read_schedule, retry_with_schedule};
use discovery_provider::ProviderError;

use crate::error::EngineError;

/// Resource types excluded from the advanced query — the aggregator
/// happily returns these, but nothing downstream in this crawl consumes
/// them, so they're filtered at the source rather than discarded later.
const EXCLUDED_RESOURCE_TYPES: &[&str] = &["AWS::Config::ResourceCompliance"];

fn build_query() -> String {
    let excluded = EXCLUDED_RESOURCE_TYPES
        .iter()
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT *, configuration, configurationItemStatus, relationships, \
         supplementaryConfiguration, tags WHERE resourceType NOT IN ({excluded})"
    )
}

/// Reads every page of the advanced aggregate query, retried on the
/// §4.1-mandated aggregator schedule (5 attempts, `2000*2^attempt` ms),
/// then applies the `shouldDiscover` filter.
pub async fn read_baseline(
    config_service: &ConfigServiceClient,
    aggregator_name: &str,
    identity: &str,
    accounts: &AccountsMap,
) -> Result<Vec<Resource>, EngineError> {
    let query = build_query();
    let rows = retry_with_schedule(
        aggregator_read_schedule(),
        || config_service.select_aggregate_resource_config(aggregator_name, &query, identity),
        |err: &ProviderError| !matches!(err, ProviderError::AggregatorNotFound(_)),
    )
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| parse_resource(&row.json))
        .filter(|resource| should_discover(resource, accounts))
        .collect())
}

/// `status != ResourceNotRecorded && accountId in accounts-map &&
/// (region == global || region in accounts-map[accountId].regions)`.
/// Guarantees a resource whose account/region left the crawl's scope does
/// not linger just because the aggregator hasn't caught up yet.
fn should_discover(resource: &Resource, accounts: &AccountsMap) -> bool {
    if resource.configuration_item_status.as_deref() == Some("ResourceNotRecorded") {
        return false;
    }
    let Some(account) = accounts.get(&resource.account_id) else {
        return false;
    };
    resource.is_global() || account.region_names().any(|r| r == resource.region)
}

fn parse_resource(row: &serde_json::Value) -> Option<Resource> {
    let id = row.get("resourceId").and_then(|v| v.as_str())?;
    let arn = row.get("arn").and_then(|v| v.as_str()).unwrap_or(id);
    let account_id = row.get("accountId").and_then(|v| v.as_str())?.to_string();
    let region = row
        .get("awsRegion")
        .and_then(|v| v.as_str())
        .unwrap_or(discovery_core::constants::GLOBAL_REGION)
        .to_string();
    let resource_type = row.get("resourceType").and_then(|v| v.as_str())?.to_string();

    let mut resource = Resource::new(arn, account_id, region, resource_type, id);
    resource.resource_name = row
        .get("resourceName")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    resource.availability_zone = row
        .get("availabilityZone")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    resource.configuration = row.get("configuration").cloned().unwrap_or(serde_json::Value::Null);
    resource.supplementary_configuration = row
        .get("supplementaryConfiguration")
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    resource.configuration_item_capture_time = row
        .get("configurationItemCaptureTime")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    resource.configuration_item_status = row
        .get("configurationItemStatus")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    resource.tags = row
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|tags| {
            tags.iter()
                .filter_map(|t| {
                    Some(Tag {
                        key: t.get("key").and_then(|v| v.as_str())?.to_string(),
                        value: t.get("value").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(resource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::account::{Account, AccountRegion};
    use serde_json::json;

    fn accounts_with_region(account_id: &str, region: &str) -> AccountsMap {
        let mut account = Account::new(account_id, "example");
        account.is_iam_role_deployed = true;
        account.regions.push(AccountRegion {
            name: region.to_string(),
            last_crawled: None,
            is_config_enabled: Some(true),
        });
        [(account_id.to_string(), account)].into_iter().collect()
    }

    #[test]
    fn resource_not_recorded_is_filtered_out() {
        let accounts = accounts_with_region("111111111111", "us-east-1");
        let mut resource = Resource::new("arn:1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1");
        resource.configuration_item_status = Some("ResourceNotRecorded".to_string());
        assert!(!should_discover(&resource, &accounts));
    }

    #[test]
    fn resource_from_untracked_account_is_filtered_out() {
        let accounts = accounts_with_region("111111111111", "us-east-1");
        let resource = Resource::new("arn:1", "222222222222", "us-east-1", "AWS::EC2::Instance", "i-1");
        assert!(!should_discover(&resource, &accounts));
    }

    #[test]
    fn resource_from_untracked_region_is_filtered_out_unless_global() {
        let accounts = accounts_with_region("111111111111", "us-east-1");
        let regional = Resource::new("arn:1", "111111111111", "eu-west-1", "AWS::EC2::Instance", "i-1");
        assert!(!should_discover(&regional, &accounts));

        let global = Resource::new("arn:2", "111111111111", "global", "AWS::IAM::Role", "role-1");
        assert!(should_discover(&global, &accounts));
    }

    #[test]
    fn parses_a_minimal_aggregator_row() {
        let row = json!({
            "resourceId": "i-1",
            "arn": "arn:aws:ec2:us-east-1:111111111111:instance/i-1",
            "accountId": "111111111111",
            "awsRegion": "us-east-1",
            "resourceType": "AWS::EC2::Instance",
            "tags": [{"key": "env", "value": "prod"}],
        });
        let resource = parse_resource(&row).unwrap();
        assert_eq!(resource.id.as_str(), "arn:aws:ec2:us-east-1:111111111111:instance/i-1");
        assert_eq!(resource.tag_value("env"), Some("prod"));
    }
}
