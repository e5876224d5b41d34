use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN_TARGET;
use crate::ids::ResourceId;

/// A resolved edge. `label` is normalized (uppercase, underscores), e.g.
/// `"CONTAINED_IN"`, `"ASSOCIATED_WITH"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub source: ResourceId,
    pub target: ResourceId,
    pub label: String,
}

impl Relationship {
    pub fn new(source: impl Into<ResourceId>, label: impl Into<String>, target: impl Into<ResourceId>) -> Self {
        Self {
            source: source.into(),
            label: label.into(),
            target: target.into(),
        }
    }

    /// An edge whose target could not be resolved. Never persisted — the
    /// delta engine and persister filter these out at the edge-projection
    /// step.
    pub fn unresolved(source: impl Into<ResourceId>, label: impl Into<String>) -> Self {
        Self::new(source, label, UNKNOWN_TARGET)
    }

    pub fn is_unresolved(&self) -> bool {
        self.target.as_str() == UNKNOWN_TARGET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_relationship_carries_sentinel_target() {
        let rel = Relationship::unresolved("arn:aws:ec2:r:a:network-interface/eni-1", "ATTACHED_TO");
        assert!(rel.is_unresolved());
        assert_eq!(rel.target.as_str(), "unknown");
    }

    #[test]
    fn resolved_relationship_is_not_unresolved() {
        let rel = Relationship::new("a", "CONTAINED_IN", "b");
        assert!(!rel.is_unresolved());
    }
}

/// How a `RelationshipDescriptor`'s `identifierValue` should be looked up
/// in the inferencer's lookup maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    Arn,
    ResourceId,
    ResourceName,
    Endpoint,
}

/// A pre-resolution edge descriptor. The schema-driven inferencer evaluates
/// a resource type's registered descriptors against its configuration (via
/// a JMESPath-style `path` expression) to produce these, then resolves each
/// one to a `Relationship` using the lookup maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    pub relationship_name: String,
    pub resource_type: Option<String>,
    pub identifier_type: IdentifierType,
    pub identifier_value: String,
    pub account_id: Option<String>,
    pub region: Option<String>,
    /// Appended to `relationship_name` when present — used by descriptors
    /// whose edge name varies by the referenced field (e.g. per-role-kind
    /// suffixes).
    pub rel_name_suffix: Option<String>,
}
