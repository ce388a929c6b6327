//! Best-effort observation of the provider's rate-limit budget.
//!
//! Each gated call hands its [`RateLimitSample`] (when the response carried
//! one) to a shared [`RateLimitTracker`]. The tracker only logs and signals;
//! it never blocks or fails a call. Failures that produced no response are
//! simply not recorded.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::telemetry;
use crate::types::RateLimitSample;

/// Expected request budget per window on core endpoints.
pub const EXPECTED_CORE_LIMIT: u32 = 5000;

/// Expected request budget per window on search endpoints, which the
/// provider limits far more aggressively.
pub const EXPECTED_SEARCH_LIMIT: u32 = 30;

/// Below this remaining budget, observations log at `warn` and the one-shot
/// low-budget signal fires.
pub const LOW_REMAINING_THRESHOLD: u32 = 1000;

/// Which API surface produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFlavor {
    Rest,
    GraphQl,
}

impl ApiFlavor {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiFlavor::Rest => "REST",
            ApiFlavor::GraphQl => "GraphQL",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ApiFlavor::Rest => "rest",
            ApiFlavor::GraphQl => "graphql",
        }
    }
}

/// Records rate-limit budget observations after each call.
///
/// One instance is shared by all gated clients of a session. The
/// low-remaining telemetry signal is an explicit state transition on the
/// instance (`NotSignaled -> Signaled`): the first observation below
/// [`LOW_REMAINING_THRESHOLD`] increments the counter, every later one only
/// logs.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    low_remaining_signaled: AtomicBool,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one call.
    ///
    /// `info` is the call description (endpoint or operation name);
    /// `sample` is `None` when the failure produced no response, in which
    /// case nothing is recorded. Never fails.
    pub fn record(&self, info: &str, sample: Option<&RateLimitSample>, flavor: ApiFlavor) {
        let Some(sample) = sample else {
            return;
        };

        let search = is_search_call(info);
        let expected = if search {
            EXPECTED_SEARCH_LIMIT
        } else {
            EXPECTED_CORE_LIMIT
        };
        if sample.limit < expected {
            warn!(
                limit = sample.limit,
                expected, info, "unexpectedly low rate limit"
            );
        }

        if !search && sample.remaining < LOW_REMAINING_THRESHOLD {
            warn!(
                "{} remaining={} cost={} {}",
                flavor.as_str(),
                sample.remaining,
                sample.cost,
                info
            );
            if !self.low_remaining_signaled.swap(true, Ordering::Relaxed) {
                metrics::counter!(telemetry::RATE_LIMIT_LOW_TOTAL, "flavor" => flavor.label())
                    .increment(1);
            }
        } else {
            debug!(
                "{} remaining={} cost={} {}",
                flavor.as_str(),
                sample.remaining,
                sample.cost,
                info
            );
        }
    }

    /// Whether the one-shot low-budget signal has fired on this instance.
    pub fn has_signaled_low_remaining(&self) -> bool {
        self.low_remaining_signaled.load(Ordering::Relaxed)
    }
}

/// Search endpoints get their own, much smaller budget. A call is a search
/// call when its path contains a `/search/` segment.
fn is_search_call(info: &str) -> bool {
    info.contains("/search/")
}
