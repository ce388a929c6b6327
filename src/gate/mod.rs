//! Admission control and quota observation.
//!
//! Every outbound call crosses two pieces of shared state on its way to the
//! network: the [`Bulkhead`], which caps how many calls may be in flight at
//! once, and the [`RateLimitTracker`], which watches how much of the
//! provider's quota each response says is left. The gated clients in
//! [`client`](crate::client) wire both in; nothing else in the crate touches
//! them directly.

mod bulkhead;
mod tracker;

pub use bulkhead::{Bulkhead, OverloadPolicy, DEFAULT_CAPACITY, LOW_SLOT_WATERMARK};
pub use tracker::{
    ApiFlavor, RateLimitTracker, EXPECTED_CORE_LIMIT, EXPECTED_SEARCH_LIMIT,
    LOW_REMAINING_THRESHOLD,
};
