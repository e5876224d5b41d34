//! The save transformation (§4.9): every resource is projected through a
//! deterministic, property-subset transformation before the delta engine
//! diffs it against the stored copy. Grounded on
//! `claria-export::templates` stringifying nested report data into a flat
//! property bag the same way, generalized here to resource configuration
//! rather than assessment content.

use md5::{Digest, Md5};
use serde_json::{Map, Value};

use discovery_core::resource::Resource;

/// A resource reduced to the flat property bag the graph store accepts —
/// every nested `Value` stringified, derived fields computed, ready to
/// hand to `GraphStoreClient` or diff against a `StoredResource`.
#[derive(Debug, Clone)]
pub struct ProjectedResource {
    pub id: String,
    pub label: String,
    pub md5_hash: Option<String>,
    pub properties: Map<String, Value>,
}

/// Projects every resource in the working set. Pure and order-preserving
/// — called once, just before `delta::compute`.
pub fn project_all(working_set: &[Resource]) -> Vec<ProjectedResource> {
    working_set.iter().map(project).collect()
}

pub fn project(resource: &Resource) -> ProjectedResource {
    let login_url = derive_login_url(resource);
    let logged_in_url = login_url.as_ref().map(|url| derive_logged_in_url(url));
    let title = derive_title(resource);

    let properties = build_properties(resource, &login_url, &logged_in_url, &title);

    let md5_hash = resource.uses_hash_detection().then(|| hash_properties(&properties));

    ProjectedResource {
        id: resource.id.as_str().to_string(),
        label: resource.resource_type.replace("::", "_"),
        md5_hash,
        properties,
    }
}

/// Builds the fixed property subset in a stable key order — stable so
/// `hash_properties` is deterministic independent of `serde_json`'s map
/// insertion order.
fn build_properties(
    resource: &Resource,
    login_url: &Option<String>,
    logged_in_url: &Option<String>,
    title: &Option<String>,
) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("accountId".into(), Value::String(resource.account_id.clone()));
    properties.insert("region".into(), Value::String(resource.region.clone()));
    insert_opt_string(&mut properties, "availabilityZone", resource.availability_zone.clone());
    properties.insert("resourceType".into(), Value::String(resource.resource_type.clone()));
    properties.insert("resourceId".into(), Value::String(resource.resource_id.clone()));
    insert_opt_string(&mut properties, "resourceName", resource.resource_name.clone());
    properties.insert("configuration".into(), stringify(&resource.configuration));
    properties.insert("supplementaryConfiguration".into(), stringify(&resource.supplementary_configuration));
    properties.insert("tags".into(), stringify(&serde_json::to_value(&resource.tags).unwrap_or(Value::Null)));
    insert_opt_string(
        &mut properties,
        "configurationItemCaptureTime",
        resource.configuration_item_capture_time.clone(),
    );
    insert_opt_string(&mut properties, "configurationItemStatus", resource.configuration_item_status.clone());
    insert_opt_string(&mut properties, "vpcId", resource.vpc_id.clone());
    insert_opt_string(&mut properties, "subnetId", resource.subnet_id.clone());
    if let Some(private) = resource.private {
        properties.insert("private".into(), Value::Bool(private));
    }
    insert_opt_string(&mut properties, "loginURL", login_url.clone());
    insert_opt_string(&mut properties, "loggedInURL", logged_in_url.clone());
    insert_opt_string(&mut properties, "title", title.clone());
    properties
}

fn insert_opt_string(properties: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value {
        properties.insert(key.to_string(), Value::String(value));
    }
}

/// `Value::Null`/missing stringify to an empty string rather than the
/// literal `"null"` — the graph store has no concept of a present-but-nil
/// property, only an absent one.
fn stringify(value: &Value) -> Value {
    if value.is_null() {
        Value::String(String::new())
    } else {
        Value::String(value.to_string())
    }
}

fn hash_properties(properties: &Map<String, Value>) -> String {
    let canonical: Vec<(&String, &Value)> = properties.iter().collect();
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Md5::digest(&bytes);
    format!("{digest:x}")
}

/// `loginURL` per-type rule table. A type outside this table gets no
/// console deep link rather than a guessed one.
fn derive_login_url(resource: &Resource) -> Option<String> {
    let region = &resource.region;
    match resource.resource_type.as_str() {
        "AWS::ApiGateway::RestApi" => {
            Some(format!("https://{}.execute-api.{region}.amazonaws.com", resource.resource_id))
        }
        "AWS::AutoScaling::AutoScalingGroup" => Some(format!(
            "https://console.aws.amazon.com/ec2autoscaling/home?region={region}#/details/{}",
            resource.resource_id
        )),
        "AWS::Lambda::Function" => Some(format!(
            "https://console.aws.amazon.com/lambda/home?region={region}#/functions/{}",
            resource.resource_id
        )),
        "AWS::IAM::Role" => {
            Some(format!("https://console.aws.amazon.com/iam/home#/roles/{}", resource.resource_id))
        }
        "AWS::IAM::User" => {
            Some(format!("https://console.aws.amazon.com/iam/home#/users/{}", resource.resource_id))
        }
        "AWS::S3::Bucket" => Some(format!("https://s3.console.aws.amazon.com/s3/buckets/{}", resource.resource_id)),
        "AWS::EC2::Instance" => Some(format!(
            "https://console.aws.amazon.com/ec2/home?region={region}#InstanceDetails:instanceId={}",
            resource.resource_id
        )),
        "AWS::EC2::VPC" => {
            Some(format!("https://console.aws.amazon.com/vpc/home?region={region}#VpcDetails:VpcId={}", resource.resource_id))
        }
        _ => None,
    }
}

/// The federated-login wrapper around a console deep link. Distinct from
/// `loginURL` only by the wrapping endpoint — kept as its own function
/// because the wrapper host is a deployment detail, not a per-type rule.
fn derive_logged_in_url(login_url: &str) -> String {
    format!(
        "https://signin.aws.amazon.com/federation?Action=login&Destination={}",
        urlencoding_lite(login_url)
    )
}

/// Percent-encodes just the handful of characters that appear in the
/// console URLs this module builds — a full percent-encoder isn't needed
/// here because every `loginURL` comes from a fixed format string, never
/// untrusted input.
fn urlencoding_lite(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            ':' => "%3A".to_string(),
            '/' => "%2F".to_string(),
            '#' => "%23".to_string(),
            '?' => "%3F".to_string(),
            '=' => "%3D".to_string(),
            '&' => "%26".to_string(),
            other => other.to_string(),
        })
        .collect()
}

const ARN_TITLE_TYPES: &[&str] = &[
    "AWS::ElasticLoadBalancingV2::TargetGroup",
    "AWS::ElasticLoadBalancingV2::Listener",
    "AWS::AutoScaling::AutoScalingGroup",
];

fn derive_title(resource: &Resource) -> Option<String> {
    if let Some(name) = resource.tag_value("Name") {
        return Some(name.to_string());
    }
    if ARN_TITLE_TYPES.contains(&resource.resource_type.as_str()) {
        if let Some(title) = title_from_arn(resource.id.as_str()) {
            return Some(title);
        }
    }
    resource.resource_name.clone().or_else(|| Some(resource.resource_id.clone()))
}

/// Pulls the last `/`-delimited ARN resource segment, e.g.
/// `arn:aws:elasticloadbalancing:...:targetgroup/my-tg/abc123` → `my-tg`.
fn title_from_arn(arn: &str) -> Option<String> {
    let resource_part = arn.rsplit_once(':')?.1;
    let mut segments = resource_part.split('/');
    segments.next();
    segments.next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::resource::{Resource, Tag};

    #[test]
    fn title_prefers_name_tag_over_everything_else() {
        let mut resource = Resource::new("arn:aws:ec2:us-east-1:111111111111:instance/i-1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1");
        resource.tags.push(Tag { key: "Name".into(), value: "my-instance".into() });
        resource.resource_name = Some("ignored".into());
        assert_eq!(derive_title(&resource), Some("my-instance".to_string()));
    }

    #[test]
    fn title_falls_back_to_arn_segment_for_target_groups() {
        let resource = Resource::new(
            "arn:aws:elasticloadbalancing:us-east-1:111111111111:targetgroup/my-tg/abc123",
            "111111111111",
            "us-east-1",
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            "my-tg/abc123",
        );
        assert_eq!(derive_title(&resource), Some("my-tg".to_string()));
    }

    #[test]
    fn title_falls_back_to_resource_id_when_nothing_else_is_available() {
        let resource = Resource::new("arn:aws:ec2:us-east-1:111111111111:vpc/vpc-1", "111111111111", "us-east-1", "AWS::EC2::VPC", "vpc-1");
        assert_eq!(derive_title(&resource), Some("vpc-1".to_string()));
    }

    #[test]
    fn md5_hash_is_only_computed_for_hash_set_types() {
        let instance = Resource::new("arn:1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1");
        assert!(project(&instance).md5_hash.is_none());

        let target_group = Resource::new(
            "arn:aws:elasticloadbalancing:us-east-1:111111111111:targetgroup/tg/1",
            "111111111111",
            "us-east-1",
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            "tg/1",
        );
        assert!(project(&target_group).md5_hash.is_some());
    }

    #[test]
    fn md5_hash_is_deterministic_for_identical_inputs() {
        let mut a = Resource::new(
            "arn:aws:elasticloadbalancing:us-east-1:111111111111:targetgroup/tg/1",
            "111111111111",
            "us-east-1",
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            "tg/1",
        );
        a.configuration = serde_json::json!({ "Port": 80 });
        let b = a.clone();
        assert_eq!(project(&a).md5_hash, project(&b).md5_hash);
    }

    #[test]
    fn null_configuration_stringifies_to_empty_string_not_the_word_null() {
        let resource = Resource::new("arn:1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1");
        let projected = project(&resource);
        assert_eq!(projected.properties.get("configuration"), Some(&Value::String(String::new())));
    }
}
