//! Telemetry metric name constants.
//!
//! Centralised metric names for heimdall operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `heimdall_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `flavor` — API flavor: "rest" or "graphql"
//! - `policy` — overload policy in effect: "proceed" or "refuse"
//! - `kind` — cache hit kind: "fresh" or "revalidated"
//! - `reason` — compare fallback reason: "truncated" or "server_error"

/// Total requests dispatched through the gated clients.
///
/// Labels: `flavor`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "heimdall_requests_total";

/// Total gate overload events (admission attempted with zero free slots).
///
/// Labels: `policy`.
pub const GATE_OVERLOADS_TOTAL: &str = "heimdall_gate_overloads_total";

/// One-shot signal: rate-limit remaining dropped below the low-water
/// threshold. Incremented at most once per tracker instance.
pub const RATE_LIMIT_LOW_TOTAL: &str = "heimdall_rate_limit_low_total";

/// Total avatar cache hits.
///
/// Labels: `kind` ("fresh" | "revalidated").
pub const CACHE_HITS_TOTAL: &str = "heimdall_cache_hits_total";

/// Total avatar cache misses (cold fetch, including corrupt-entry recovery).
pub const CACHE_MISSES_TOTAL: &str = "heimdall_cache_misses_total";

/// Total compare operations that switched to the paginated file listing.
///
/// Labels: `reason` ("truncated" | "server_error").
pub const COMPARE_FALLBACKS_TOTAL: &str = "heimdall_compare_fallbacks_total";
