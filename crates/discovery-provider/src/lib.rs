//! discovery-provider
//!
//! Thin typed adapters over the AWS SDK clients the discovery engine talks
//! to, plus the cross-cutting concerns every one of them needs: keyed
//! throttling, retry with backoff, and finite lazy pagination.

pub mod clients;
pub mod error;
pub mod paginate;
pub mod retry;
pub mod throttle;

pub use error::ProviderError;
pub use throttle::Throttler;
