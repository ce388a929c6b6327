//! Per-call rate-limit budget sample.

use reqwest::header::HeaderMap;
use serde_json::Value;

/// A snapshot of the provider's rate-limit budget, derived from one call.
///
/// REST responses carry the budget in `x-ratelimit-*` headers; GraphQL
/// responses carry it in a `rateLimit { limit cost remaining resetAt }`
/// payload field when the query asks for it. A sample lives for exactly one
/// call — it feeds the [`RateLimitTracker`](crate::gate::RateLimitTracker)
/// and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSample {
    /// Maximum requests (REST) or points (GraphQL) per window.
    pub limit: u32,
    /// Budget remaining in the current window.
    pub remaining: u32,
    /// What this call cost. REST calls always cost 1; GraphQL reports
    /// a per-query point cost.
    pub cost: u32,
    /// When the window resets, verbatim from the provider (epoch seconds
    /// for REST, ISO-8601 for GraphQL). Logged, never interpreted.
    pub reset_at: Option<String>,
}

impl RateLimitSample {
    /// Extract a sample from REST response headers.
    ///
    /// Returns `None` when the limit/remaining pair is absent — proxies and
    /// error pages routinely strip these headers, and accounting is
    /// best-effort.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limit = header_u32(headers, "x-ratelimit-limit")?;
        let remaining = header_u32(headers, "x-ratelimit-remaining")?;
        let reset_at = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Some(Self {
            limit,
            remaining,
            cost: 1,
            reset_at,
        })
    }

    /// Extract a sample from a GraphQL response's `data` payload.
    ///
    /// Looks for the conventional top-level `rateLimit` object. Queries
    /// that don't request it produce `None`.
    pub fn from_graphql(data: &Value) -> Option<Self> {
        let rate_limit = data.get("rateLimit")?;
        Some(Self {
            limit: rate_limit.get("limit")?.as_u64()? as u32,
            remaining: rate_limit.get("remaining")?.as_u64()? as u32,
            cost: rate_limit
                .get("cost")
                .and_then(Value::as_u64)
                .unwrap_or(1) as u32,
            reset_at: rate_limit
                .get("resetAt")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
    }
}

fn header_u32(headers: &HeaderMap, name: &str) -> Option<u32> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()
}
