//! DeltaEngine (§4.8): diffs the freshly inferred working set against the
//! resources and relationships read from the graph store at the start of
//! the crawl. Grounded on `claria-provisioner::orchestrate::plan`'s
//! three-way `(Lifecycle, Option<actual>)` match, generalized here from
//! "Data vs Managed lifecycle" to "store vs update vs delete".

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use discovery_core::constants::is_in_hash_set;
use discovery_core::relationship::Relationship;
use discovery_core::resource::Resource;
use discovery_store::graph_client::{StoredRelationship, StoredResource};

use crate::projection::{self, ProjectedResource};

const TAG_RESOURCE_TYPE: &str = "AWS::Tags::Tag";

#[derive(Debug, Clone)]
pub struct ResourceUpdate {
    pub id: String,
    pub label: String,
    pub changed_properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct Delta {
    pub resources_to_store: Vec<ProjectedResource>,
    pub resources_to_update: Vec<ResourceUpdate>,
    pub resource_ids_to_delete: Vec<String>,
    pub links_to_add: Vec<Relationship>,
    pub links_to_delete: Vec<Relationship>,
}

pub fn compute(working_set: &[Resource], db_resources: &[StoredResource], db_relationships: &[StoredRelationship]) -> Delta {
    let projected = projection::project_all(working_set);
    let db_by_id: HashMap<&str, &StoredResource> = db_resources.iter().map(|r| (r.id.as_str(), r)).collect();
    let live_ids: HashSet<&str> = projected.iter().map(|p| p.id.as_str()).collect();

    let mut resources_to_store = Vec::new();
    let mut resources_to_update = Vec::new();

    for (resource, current) in working_set.iter().zip(projected.into_iter()) {
        match db_by_id.get(current.id.as_str()) {
            None => resources_to_store.push(current),
            Some(stored) => {
                if let Some(changed_properties) = decide_update(resource, &current, stored) {
                    resources_to_update.push(ResourceUpdate {
                        id: current.id,
                        label: current.label,
                        changed_properties,
                    });
                }
            }
        }
    }

    let resource_ids_to_delete: Vec<String> =
        db_resources.iter().filter(|r| !live_ids.contains(r.id.as_str())).map(|r| r.id.clone()).collect();

    let (links_to_add, links_to_delete) = diff_edges(working_set, db_relationships);

    Delta {
        resources_to_store,
        resources_to_update,
        resource_ids_to_delete,
        links_to_add,
        links_to_delete,
    }
}

/// `None` means no update is needed; `Some(map)` carries only the property
/// keys whose values differ from the stored copy.
fn decide_update(resource: &Resource, current: &ProjectedResource, stored: &StoredResource) -> Option<Map<String, Value>> {
    let should_update = if is_in_hash_set(&resource.resource_type) {
        current.md5_hash != stored.md5_hash
    } else if stored_supplementary_is_null(stored) && !resource.supplementary_configuration.is_null() {
        true
    } else if resource.resource_type == TAG_RESOURCE_TYPE {
        false
    } else {
        stored_capture_time(stored) != resource.configuration_item_capture_time.as_deref()
    };

    if !should_update {
        return None;
    }

    let stored_properties = stored.properties.as_object();
    let mut changed = Map::new();
    for (key, value) in &current.properties {
        let differs = match stored_properties.and_then(|m| m.get(key)) {
            Some(stored_value) => stored_value != value,
            None => true,
        };
        if differs {
            changed.insert(key.clone(), value.clone());
        }
    }
    Some(changed)
}

fn stored_supplementary_is_null(stored: &StoredResource) -> bool {
    stored
        .properties
        .get("supplementaryConfiguration")
        .map(|v| v.is_null() || v == &Value::String(String::new()))
        .unwrap_or(true)
}

fn stored_capture_time(stored: &StoredResource) -> Option<&str> {
    stored.properties.get("configurationItemCaptureTime").and_then(Value::as_str)
}

type EdgeTuple = (String, String, String);

fn diff_edges(working_set: &[Resource], db_relationships: &[StoredRelationship]) -> (Vec<Relationship>, Vec<Relationship>) {
    let current: HashSet<EdgeTuple> = working_set
        .iter()
        .flat_map(|r| &r.relationships)
        .filter(|rel| !rel.is_unresolved())
        .map(|rel| (rel.source.as_str().to_string(), rel.label.clone(), rel.target.as_str().to_string()))
        .collect();

    let stored: HashSet<EdgeTuple> =
        db_relationships.iter().map(|r| (r.source.clone(), r.label.clone(), r.target.clone())).collect();

    let links_to_add = current.difference(&stored).map(|(s, l, t)| Relationship::new(s.clone(), l.clone(), t.clone())).collect();
    let links_to_delete = stored.difference(&current).map(|(s, l, t)| Relationship::new(s.clone(), l.clone(), t.clone())).collect();

    (links_to_add, links_to_delete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::resource::Resource;
    use serde_json::json;

    fn resource_type_a() -> Resource {
        let mut r = Resource::new("arn:1", "111111111111", "us-east-1", "AWS::EC2::Instance", "i-1");
        r.configuration_item_capture_time = Some("2026-01-01T00:00:00Z".into());
        r
    }

    #[test]
    fn new_resource_lands_in_resources_to_store() {
        let working_set = vec![resource_type_a()];
        let delta = compute(&working_set, &[], &[]);
        assert_eq!(delta.resources_to_store.len(), 1);
        assert!(delta.resources_to_update.is_empty());
    }

    #[test]
    fn vanished_resource_lands_in_resource_ids_to_delete() {
        let stored = vec![StoredResource {
            id: "arn:1".into(),
            label: "AWS_EC2_Instance".into(),
            md5_hash: None,
            properties: json!({}),
        }];
        let delta = compute(&[], &stored, &[]);
        assert_eq!(delta.resource_ids_to_delete, vec!["arn:1".to_string()]);
    }

    #[test]
    fn capture_time_drift_triggers_an_update_with_only_changed_keys() {
        let working_set = vec![resource_type_a()];
        let stored = vec![StoredResource {
            id: "arn:1".into(),
            label: "AWS_EC2_Instance".into(),
            md5_hash: None,
            properties: json!({
                "configurationItemCaptureTime": "2025-01-01T00:00:00Z",
                "resourceId": "i-1",
            }),
        }];
        let delta = compute(&working_set, &stored, &[]);
        assert_eq!(delta.resources_to_update.len(), 1);
        let update = &delta.resources_to_update[0];
        assert!(update.changed_properties.contains_key("configurationItemCaptureTime"));
        assert!(!update.changed_properties.contains_key("resourceId"));
    }

    #[test]
    fn matching_capture_time_triggers_no_update() {
        let working_set = vec![resource_type_a()];
        let stored = vec![StoredResource {
            id: "arn:1".into(),
            label: "AWS_EC2_Instance".into(),
            md5_hash: None,
            properties: json!({ "configurationItemCaptureTime": "2026-01-01T00:00:00Z" }),
        }];
        let delta = compute(&working_set, &stored, &[]);
        assert!(delta.resources_to_update.is_empty());
    }

    #[test]
    fn hash_set_type_updates_only_on_hash_drift() {
        let mut target_group = Resource::new(
            "arn:aws:elasticloadbalancing:us-east-1:111111111111:targetgroup/tg/1",
            "111111111111",
            "us-east-1",
            "AWS::ElasticLoadBalancingV2::TargetGroup",
            "tg/1",
        );
        target_group.configuration = json!({ "Port": 443 });
        let current_hash = projection::project(&target_group).md5_hash.unwrap();

        let stored = vec![StoredResource {
            id: target_group.id.as_str().to_string(),
            label: "AWS_ElasticLoadBalancingV2_TargetGroup".into(),
            md5_hash: Some(current_hash),
            properties: json!({}),
        }];
        let delta = compute(&[target_group], &stored, &[]);
        assert!(delta.resources_to_update.is_empty());
    }

    #[test]
    fn tag_type_never_updates_by_capture_time() {
        let mut tag = Resource::new("arn:tag:1", "111111111111", "us-east-1", TAG_RESOURCE_TYPE, "tag-1");
        tag.configuration_item_capture_time = Some("2026-02-01T00:00:00Z".into());
        let stored = vec![StoredResource {
            id: "arn:tag:1".into(),
            label: "AWS_Tags_Tag".into(),
            md5_hash: None,
            properties: json!({ "configurationItemCaptureTime": "2020-01-01T00:00:00Z" }),
        }];
        let delta = compute(&[tag], &stored, &[]);
        assert!(delta.resources_to_update.is_empty());
    }

    #[test]
    fn new_edge_lands_in_links_to_add_and_unresolved_edges_are_excluded() {
        let mut resource = resource_type_a();
        resource.relationships.push(Relationship::new(resource.id.clone(), "CONTAINS", "arn:2"));
        resource.relationships.push(Relationship::unresolved(resource.id.clone(), "ATTACHED_TO"));

        let delta = compute(&[resource], &[], &[]);
        assert_eq!(delta.links_to_add.len(), 1);
        assert_eq!(delta.links_to_add[0].label, "CONTAINS");
    }

    #[test]
    fn vanished_edge_lands_in_links_to_delete() {
        let db_relationships = vec![StoredRelationship {
            source: "arn:1".into(),
            label: "CONTAINS".into(),
            target: "arn:2".into(),
        }];
        let delta = compute(&[resource_type_a()], &[], &db_relationships);
        assert_eq!(delta.links_to_delete.len(), 1);
    }
}
