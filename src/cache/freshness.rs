//! HTTP cache freshness computation.
//!
//! Implements the subset of RFC 9111 the avatar cache needs: `cache-control`
//! directive parsing (`s-maxage` over `max-age`, everything else preserved
//! verbatim) and expiry relative to the response's `date` header.

use std::time::{Duration, SystemTime};

use super::meta::StoredHeaders;

/// Parsed `cache-control` directives.
///
/// `max_age`/`s_maxage` are extracted for the freshness computation; all
/// directives, recognized or not, are kept verbatim in `directives` in
/// document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    pub max_age: Option<u64>,
    pub s_maxage: Option<u64>,
    pub directives: Vec<(String, Option<String>)>,
}

impl CacheControl {
    /// Parse a `cache-control` header value.
    ///
    /// Unparseable `max-age`/`s-maxage` values are treated as absent rather
    /// than rejected; the directive still appears verbatim in `directives`.
    pub fn parse(value: &str) -> Self {
        let mut parsed = Self::default();
        for directive in value.split(',') {
            let directive = directive.trim();
            if directive.is_empty() {
                continue;
            }
            let (name, argument) = match directive.split_once('=') {
                Some((name, argument)) => {
                    (name.trim(), Some(argument.trim().trim_matches('"').to_owned()))
                }
                None => (directive, None),
            };
            let lowered = name.to_ascii_lowercase();
            let seconds = argument.as_deref().and_then(|a| a.parse::<u64>().ok());
            match lowered.as_str() {
                "max-age" => parsed.max_age = seconds,
                "s-maxage" => parsed.s_maxage = seconds,
                _ => {}
            }
            parsed.directives.push((name.to_owned(), argument));
        }
        parsed
    }

    /// The effective freshness lifetime: `s-maxage` wins over `max-age`,
    /// absence of both means zero (always stale).
    pub fn freshness_lifetime(&self) -> Duration {
        Duration::from_secs(self.s_maxage.or(self.max_age).unwrap_or(0))
    }
}

/// Parse an HTTP date header (IMF-fixdate, RFC 2822 compatible).
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    chrono::DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(SystemTime::from)
}

/// When a response with the given `date` and `cache-control` expires.
///
/// `expire_at = (date header or now) + (s-maxage ?? max-age ?? 0)`.
pub fn expires_at(
    date: Option<SystemTime>,
    cache_control: &CacheControl,
    now: SystemTime,
) -> SystemTime {
    let base = date.unwrap_or(now);
    // An overflowing lifetime is effectively immortal; a year from now is
    // plenty to count as fresh.
    base.checked_add(cache_control.freshness_lifetime())
        .unwrap_or_else(|| now + Duration::from_secs(31_536_000))
}

/// Whether a stored response is still fresh at `now` — i.e. may be served
/// without contacting the origin.
pub fn is_fresh(stored: &StoredHeaders, now: SystemTime) -> bool {
    let cache_control = stored
        .cache_control
        .as_deref()
        .map(CacheControl::parse)
        .unwrap_or_default();
    let date = stored.date.as_deref().and_then(parse_http_date);
    expires_at(date, &cache_control, now) > now
}
