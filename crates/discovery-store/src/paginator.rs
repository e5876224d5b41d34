//! The graph store's adaptive paginator.
//!
//! Unlike `discovery-provider`'s token-based `Paginator`, the graph store
//! pages by an explicit `(start, end)` window. On a "payload too large"
//! signal it halves the window and replays the same `start`; on success it
//! advances the window and resets the page size back to the configured
//! default.

use crate::error::StoreError;

#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

/// Drives one paged read against a size `total` collection, starting at
/// page size `default_page_size` and halving on payload-too-large until the
/// fetch succeeds or the window collapses to a single item.
pub struct AdaptivePaginator {
    cursor: usize,
    total: usize,
    default_page_size: usize,
    current_page_size: usize,
}

impl AdaptivePaginator {
    pub fn new(total: usize, default_page_size: usize) -> Self {
        Self {
            cursor: 0,
            total,
            default_page_size,
            current_page_size: default_page_size,
        }
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.total
    }

    pub fn next_window(&self) -> Window {
        Window {
            start: self.cursor,
            end: (self.cursor + self.current_page_size).min(self.total),
        }
    }

    /// Call after a successful fetch of `next_window()`: advances past the
    /// window and resets the page size to the default.
    pub fn advance(&mut self) {
        let window = self.next_window();
        self.cursor = window.end;
        self.current_page_size = self.default_page_size;
    }

    /// Call after a `StoreError::PayloadTooLarge` on `next_window()`: halves
    /// the page size without moving the cursor, so the same start is
    /// replayed on the next call to `next_window()`.
    pub fn halve(&mut self) {
        self.current_page_size = (self.current_page_size / 2).max(1);
    }

    /// Runs `fetch` to exhaustion, halving on `PayloadTooLarge` and
    /// collecting every page's items via `extend`.
    pub async fn collect_all<T, F, Fut>(mut self, mut fetch: F) -> Result<Vec<T>, StoreError>
    where
        F: FnMut(Window) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<T>, StoreError>>,
    {
        let mut out = Vec::new();
        while !self.is_done() {
            let window = self.next_window();
            match fetch(window).await {
                Ok(items) => {
                    out.extend(items);
                    self.advance();
                }
                Err(StoreError::PayloadTooLarge) => self.halve(),
                Err(other) => return Err(other),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn halves_on_payload_too_large_then_resets_on_success() {
        let calls = AtomicUsize::new(0);
        let paginator = AdaptivePaginator::new(10, 10);
        let result = paginator
            .collect_all(|window| {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        assert_eq!(window.start, 0);
                        assert_eq!(window.end, 10);
                        Err(StoreError::PayloadTooLarge)
                    } else {
                        Ok((window.start..window.end).collect::<Vec<usize>>())
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, (0..10).collect::<Vec<usize>>());
    }

    #[tokio::test]
    async fn advances_through_full_collection() {
        let paginator = AdaptivePaginator::new(25, 10);
        let result = paginator
            .collect_all(|window| async move { Ok((window.start..window.end).collect::<Vec<usize>>()) })
            .await
            .unwrap();
        assert_eq!(result, (0..25).collect::<Vec<usize>>());
    }
}
