//! discovery-core
//!
//! Pure domain types for the cloud resource discovery engine: resources,
//! relationships, accounts, and the fixed constants (hash set, normalization
//! set) the rest of the workspace builds on. No AWS SDK dependency — this is
//! the shared vocabulary of the discovery system.

pub mod account;
pub mod constants;
pub mod error;
pub mod ids;
pub mod relationship;
pub mod resource;

pub use account::{Account, AccountRegion};
pub use constants::{is_in_hash_set, is_in_normalization_set, GLOBAL_REGION, UNKNOWN_TARGET};
pub use error::CoreError;
pub use ids::ResourceId;
pub use relationship::{IdentifierType, Relationship, RelationshipDescriptor};
pub use resource::Resource;
