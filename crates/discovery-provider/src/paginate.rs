//! Lazy, finite, non-restartable pagination over a token-based SDK list
//! operation.
//!
//! AWS list APIs hand back an opaque `next_token` until the last page, which
//! returns `None`. `Paginator` wraps that shape once so every adapter in
//! `clients/` drives its pages the same way, with the `Throttler` acquired
//! once per page rather than once per item.

use std::future::Future;

use crate::error::ProviderError;
use crate::throttle::Throttler;

/// One page of results plus the token to fetch the next one, if any.
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Drives `fetch` across every page of a token-paginated list operation,
/// acquiring a throttle slot before each call. Consumed once — there is no
/// way to restart from the middle, matching how the discovery engine walks
/// a listing exactly once per crawl.
pub struct Paginator<'a, T, F> {
    fetch: F,
    token: Option<String>,
    done: bool,
    throttler: &'a Throttler,
    operation: &'a str,
    identity: &'a str,
    region: &'a str,
    limit: u32,
    interval_ms: u64,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T, F, Fut> Paginator<'a, T, F>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    pub fn new(
        fetch: F,
        throttler: &'a Throttler,
        operation: &'a str,
        identity: &'a str,
        region: &'a str,
        (limit, interval_ms): (u32, u64),
    ) -> Self {
        Self {
            fetch,
            token: None,
            done: false,
            throttler,
            operation,
            identity,
            region,
            limit,
            interval_ms,
            _marker: std::marker::PhantomData,
        }
    }

    /// Fetches the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Option<Result<Vec<T>, ProviderError>> {
        if self.done {
            return None;
        }
        self.throttler
            .acquire(self.operation, self.identity, self.region, (self.limit, self.interval_ms))
            .await;
        match (self.fetch)(self.token.take()).await {
            Ok(page) => {
                self.token = page.next_token;
                if self.token.is_none() {
                    self.done = true;
                }
                Some(Ok(page.items))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }

    /// Drains every remaining page into a single `Vec`, short-circuiting on
    /// the first error.
    pub async fn collect_all(mut self) -> Result<Vec<T>, ProviderError> {
        let mut out = Vec::new();
        while let Some(page) = self.next_page().await {
            out.extend(page?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn collects_across_three_pages() {
        let throttler = Throttler::new();
        let calls = AtomicUsize::new(0);
        let pages: Vec<Vec<u32>> = vec![vec![1, 2], vec![3, 4], vec![5]];

        let paginator = Paginator::new(
            |_token| {
                let idx = calls.fetch_add(1, Ordering::SeqCst);
                let pages = pages.clone();
                async move {
                    let items = pages.get(idx).cloned().unwrap_or_default();
                    let next_token = if idx + 1 < pages.len() {
                        Some(format!("token-{idx}"))
                    } else {
                        None
                    };
                    Ok(Page { items, next_token })
                }
            },
            &throttler,
            "ListThings",
            "111111111111",
            "us-east-1",
            (20, 1000),
        );

        let all = paginator.collect_all().await.unwrap();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);
    }
}
