//! Keyed rate limiting.
//!
//! Each AWS API has its own published rate ceiling, expressed as `limit`
//! requests per `interval_ms` milliseconds, and that ceiling applies per
//! credentials identity and per region independently. A single global
//! limiter would either starve unrelated accounts sharing one process or
//! under-throttle a hot one, so buckets are memoized by
//! `(operation name, credentials identity, region)` and created lazily the
//! first time a given combination is seen.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type Bucket = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct BucketKey {
    operation: String,
    identity: String,
    region: String,
}

/// A registry of per-key token buckets, shared across an entire crawl.
///
/// Cloning a `Throttler` is cheap — it shares the same underlying map.
#[derive(Clone, Default)]
pub struct Throttler {
    buckets: Arc<DashMap<BucketKey, Arc<Bucket>>>,
}

impl Throttler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks the calling task until a slot for `(operation, identity,
    /// region)` is available under `limit` requests per `interval_ms`,
    /// creating the bucket on first use. The bucket allows a burst of
    /// `limit` and refills one token every `interval_ms / limit`.
    pub async fn acquire(&self, operation: &str, identity: &str, region: &str, (limit, interval_ms): (u32, u64)) {
        let key = BucketKey {
            operation: operation.to_string(),
            identity: identity.to_string(),
            region: region.to_string(),
        };
        let bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| {
                let limit = limit.max(1);
                let period = Duration::from_millis((interval_ms / limit as u64).max(1));
                let quota = Quota::with_period(period)
                    .unwrap()
                    .allow_burst(NonZeroU32::new(limit).unwrap());
                Arc::new(RateLimiter::direct(quota))
            })
            .clone();
        bucket.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_reuses_the_same_bucket_for_identical_keys() {
        let throttler = Throttler::new();
        throttler.acquire("DescribeInstances", "111111111111", "us-east-1", (20, 1000)).await;
        assert_eq!(throttler.buckets.len(), 1);
        throttler.acquire("DescribeInstances", "111111111111", "us-east-1", (20, 1000)).await;
        assert_eq!(throttler.buckets.len(), 1);
    }

    #[tokio::test]
    async fn distinct_regions_get_distinct_buckets() {
        let throttler = Throttler::new();
        throttler.acquire("DescribeInstances", "111111111111", "us-east-1", (20, 1000)).await;
        throttler.acquire("DescribeInstances", "111111111111", "eu-west-1", (20, 1000)).await;
        assert_eq!(throttler.buckets.len(), 2);
    }
}
