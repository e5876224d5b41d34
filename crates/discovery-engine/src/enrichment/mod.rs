//! The three-tier enrichment pipeline plus tag synthesis (§4.6).
//!
//! Each tier appends to the working resource set and is visible to the
//! tiers that follow it — tier ordering is strict, operation order within
//! a tier is not (§5). Per-item failures never abort a tier: they're
//! collected into a `Vec<HandlerFailure>` and logged, mirroring the
//! spec's `safeForEach` propagation policy (§7).

pub mod tier_a_batch;
pub mod tier_b_first_order;
pub mod tier_c_second_order;
pub mod tier_d_tags;

/// One per-item enrichment failure, collected rather than propagated.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub handler: &'static str,
    pub account_id: String,
    pub region: String,
    pub error: String,
}

impl HandlerFailure {
    pub fn new(handler: &'static str, account_id: impl Into<String>, region: impl Into<String>, error: impl ToString) -> Self {
        Self {
            handler,
            account_id: account_id.into(),
            region: region.into(),
            error: error.to_string(),
        }
    }
}
