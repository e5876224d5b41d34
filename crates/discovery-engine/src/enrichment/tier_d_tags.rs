//! Tier D — tag synthesis: one `Tag` resource per distinct `key=value`
//! pair seen anywhere in the working set, each carrying an
//! `ASSOCIATED_WITH` edge **from** the tag **to** every resource that
//! carries it.

use std::collections::BTreeMap;

use discovery_core::relationship::Relationship;
use discovery_core::resource::Resource;

pub const TAG_RESOURCE_TYPE: &str = "AWS::Tags::Tag";

/// Canonical id a synthesized tag resource gets for `key=value` — also
/// used by the AppRegistry hard-coded inference handler to look up the
/// tag resource backing an `awsApplication` tag value.
pub fn tag_resource_id(key: &str, value: &str) -> String {
    format!("aws-tag:{key}={value}")
}

/// Derives a `Tag` resource for every distinct `key=value` pair across
/// `working_set`, with one `ASSOCIATED_WITH` edge per carrying resource.
pub fn synthesize(working_set: &[Resource]) -> Vec<Resource> {
    let mut by_pair: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for resource in working_set {
        for tag in &resource.tags {
            by_pair
                .entry((tag.key.clone(), tag.value.clone()))
                .or_default()
                .push(resource.id.as_str().to_string());
        }
    }

    by_pair
        .into_iter()
        .map(|((key, value), resource_ids)| {
            let id = tag_resource_id(&key, &value);
            let mut tag = Resource::new(
                id.clone(),
                "aws",
                discovery_core::constants::GLOBAL_REGION,
                TAG_RESOURCE_TYPE,
                format!("{key}={value}"),
            )
            .with_name(format!("{key}={value}"));
            tag.configuration = serde_json::json!({ "key": key, "value": value });
            for resource_id in resource_ids {
                tag.relationships.push(Relationship::new(id.clone(), "ASSOCIATED_WITH", resource_id));
            }
            tag
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::resource::Tag;

    #[test]
    fn two_resources_sharing_a_tag_yield_one_tag_with_two_edges() {
        let mut a = Resource::new("arn:a", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1");
        a.tags.push(Tag { key: "env".into(), value: "prod".into() });
        let mut b = Resource::new("arn:b", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-2");
        b.tags.push(Tag { key: "env".into(), value: "prod".into() });

        let tags = synthesize(&[a, b]);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].relationships.len(), 2);
        assert!(tags[0].relationships.iter().all(|r| r.label == "ASSOCIATED_WITH"));
    }
}
