use thiserror::Error;

/// The fatal-error taxonomy from §7. Variants here abort the crawl and
/// propagate to `discovery-runner`'s top-level exit-code mapping; anything
/// recoverable at the item level (access-denied on a single account/region,
/// a per-handler enrichment failure) is captured and logged in place
/// instead of being represented as an `EngineError`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("VPC configuration prevents reaching: {0:?}")]
    VpcConfigurationValidation(Vec<String>),

    #[error("another discovery instance is already running")]
    DiscoveryAlreadyRunning,

    #[error("configuration aggregator {0} was not found")]
    AggregatorNotFound(String),

    #[error("configuration aggregator {0} has no OrganizationAggregationSource")]
    OrgAggregatorValidation(String),

    #[error("missing required configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Provider(#[from] discovery_provider::ProviderError),

    #[error(transparent)]
    Store(#[from] discovery_store::StoreError),

    #[error(transparent)]
    Core(#[from] discovery_core::error::CoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
