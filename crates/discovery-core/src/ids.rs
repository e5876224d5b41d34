use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical resource identifier (the resource's ARN, or a synthesized
/// equivalent for resources the provider never assigns one to, e.g. a Tag).
///
/// Wrapped rather than a bare `String` so the delta engine and inferencer
/// can't accidentally compare an `id` against a bare `resourceId` — the two
/// are composite keys of entirely different shapes.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Composite key used by the relationship inferencer's lookup maps:
/// `(resourceType, resourceId|resourceName, accountId, region)`.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ResourceIdentifierKey {
    pub resource_type: String,
    pub identifier: String,
    pub account_id: String,
    pub region: String,
}

/// Same composite key without the type component, used when resolving
/// environment variables (the type of the referenced resource is unknown
/// at the point of resolution).
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct UntypedIdentifierKey {
    pub identifier: String,
    pub account_id: String,
    pub region: String,
}
