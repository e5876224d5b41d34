use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ResourceId;
use crate::relationship::Relationship;

/// A single tag, preserved in insertion order (the provider's aggregator
/// returns tags as an ordered sequence, not a map).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// A discovered cloud entity.
///
/// Constructed by `AggregatorReader` or the `EnrichmentPipeline`, mutated
/// in-place by the `RelationshipInferencer` (derived fields + relationship
/// list), snapshot-frozen by the `DeltaEngine`, and finally stored, updated,
/// or discarded by the `Persister`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Canonical ARN (or synthesized equivalent for provider-internal
    /// resources such as a Tag).
    pub id: ResourceId,
    pub account_id: String,
    /// `"global"` for region-less resources (identity, managed policies).
    pub region: String,
    /// May be `"not-applicable"` or `"multiple"`.
    pub availability_zone: Option<String>,
    /// Structured triple `namespace::service::kind`, e.g.
    /// `"AWS::EC2::Instance"`.
    pub resource_type: String,
    pub resource_id: String,
    pub resource_name: Option<String>,
    pub configuration: Value,
    pub supplementary_configuration: Value,
    pub tags: Vec<Tag>,
    pub configuration_item_capture_time: Option<String>,
    pub configuration_item_status: Option<String>,
    pub relationships: Vec<Relationship>,

    // ── Derived fields, set by the RelationshipInferencer ──
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
    pub private: Option<bool>,
    pub login_url: Option<String>,
    pub logged_in_url: Option<String>,
    pub title: Option<String>,
    pub md5_hash: Option<String>,
}

impl Resource {
    /// A bare resource with no derived fields set yet — the shape produced
    /// by `AggregatorReader` and enrichment handlers before inference runs.
    pub fn new(
        id: impl Into<ResourceId>,
        account_id: impl Into<String>,
        region: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            region: region.into(),
            availability_zone: None,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            resource_name: None,
            configuration: Value::Null,
            supplementary_configuration: Value::Null,
            tags: Vec::new(),
            configuration_item_capture_time: None,
            configuration_item_status: None,
            relationships: Vec::new(),
            vpc_id: None,
            subnet_id: None,
            private: None,
            login_url: None,
            logged_in_url: None,
            title: None,
            md5_hash: None,
        }
    }

    /// Builder-style setter for `resource_name`, used throughout the
    /// enrichment handlers that construct a `Resource` inline from an SDK
    /// response.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    pub fn is_global(&self) -> bool {
        self.region == crate::constants::GLOBAL_REGION
    }

    /// `true` for resources of a type in the hash set — change detection for
    /// these types is driven by `md5Hash`, never `configurationItemCaptureTime`.
    pub fn uses_hash_detection(&self) -> bool {
        crate::constants::is_in_hash_set(&self.resource_type)
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }
}
