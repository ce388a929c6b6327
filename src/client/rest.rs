//! Gated REST client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::gate::{ApiFlavor, Bulkhead, OverloadPolicy, RateLimitTracker};
use crate::telemetry;
use crate::types::{RateLimitSample, RawResponse};
use crate::{HeimdallError, Result};

/// HTTP methods the REST surface uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A REST call description: method, path (with query), optional JSON body.
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: HttpMethod,
    /// Path relative to the API root, query string included.
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl RestRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    /// Short call description used for gate logging and rate-limit
    /// accounting, e.g. `GET /repos/o/r/compare/a...b`.
    pub fn info(&self) -> String {
        format!("{} {}", self.method.as_str(), self.path)
    }
}

/// A typed REST response: deserialized payload plus the raw headers.
#[derive(Debug, Clone)]
pub struct RestResponse<T> {
    pub data: T,
    pub status: u16,
    pub headers: HeaderMap,
}

/// The REST transport boundary.
///
/// Implementations return `Ok` for any response the server produced —
/// including 4xx/5xx — so the gated client can read rate-limit headers off
/// failures before classifying them. `Err` is reserved for network-level
/// failures with no response at all.
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn execute(&self, request: &RestRequest) -> Result<RawResponse>;
}

/// Decorator that routes REST calls through the gate and the tracker.
///
/// Construction wires in the shared [`Bulkhead`] and [`RateLimitTracker`];
/// the overload policy is fixed per client so call sites with different risk
/// profiles construct differently-configured clients over the same gate.
pub struct GatedRestClient {
    transport: Arc<dyn RestTransport>,
    gate: Arc<Bulkhead>,
    tracker: Arc<RateLimitTracker>,
    policy: OverloadPolicy,
}

impl GatedRestClient {
    pub fn new(
        transport: Arc<dyn RestTransport>,
        gate: Arc<Bulkhead>,
        tracker: Arc<RateLimitTracker>,
    ) -> Self {
        Self {
            transport,
            gate,
            tracker,
            policy: OverloadPolicy::default(),
        }
    }

    /// Set the overload policy for calls made through this client.
    pub fn overload_policy(mut self, policy: OverloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Execute a REST call under the gate and deserialize its payload.
    ///
    /// On overload with the `Refuse` policy this returns
    /// [`HeimdallError::ExceededRateLimit`] without touching the network.
    /// Non-2xx responses become [`HeimdallError::Api`] after rate-limit
    /// recording has been attempted.
    pub async fn call<T: DeserializeOwned>(&self, request: RestRequest) -> Result<RestResponse<T>> {
        let info = request.info();
        let transport = Arc::clone(&self.transport);
        let outcome = self
            .gate
            .execute(&info, self.policy, || async move {
                transport.execute(&request).await
            })
            .await;

        let raw = match outcome {
            Ok(raw) => raw,
            Err(e) => {
                // No response: nothing to record, best-effort accounting
                // skips the call entirely.
                metrics::counter!(telemetry::REQUESTS_TOTAL, "flavor" => "rest", "status" => "error")
                    .increment(1);
                return Err(e);
            }
        };

        let sample = RateLimitSample::from_headers(&raw.headers);
        self.tracker.record(&info, sample.as_ref(), ApiFlavor::Rest);

        if !raw.is_success() {
            metrics::counter!(telemetry::REQUESTS_TOTAL, "flavor" => "rest", "status" => "error")
                .increment(1);
            return Err(HeimdallError::Api {
                status: raw.status,
                message: api_error_message(&raw),
            });
        }

        metrics::counter!(telemetry::REQUESTS_TOTAL, "flavor" => "rest", "status" => "ok")
            .increment(1);
        let data = serde_json::from_slice(&raw.body)?;
        Ok(RestResponse {
            data,
            status: raw.status,
            headers: raw.headers,
        })
    }
}

/// Best error message available: the provider's JSON `message` field when
/// the body parses, otherwise the (truncated) raw body.
fn api_error_message(raw: &RawResponse) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&raw.body)
        && let Some(message) = value.get("message").and_then(|m| m.as_str())
    {
        return message.to_owned();
    }
    let text = String::from_utf8_lossy(&raw.body);
    let message = text.trim();
    if message.len() > 200 {
        message.chars().take(200).collect()
    } else {
        message.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_info_format() {
        let request = RestRequest::get("/repos/o/r/compare/a...b");
        assert_eq!(request.info(), "GET /repos/o/r/compare/a...b");

        let request = RestRequest::post("/graphql", serde_json::json!({}));
        assert_eq!(request.info(), "POST /graphql");
    }

    #[test]
    fn error_message_prefers_provider_message() {
        let raw = RawResponse {
            status: 404,
            headers: HeaderMap::new(),
            body: bytes::Bytes::from_static(br#"{"message":"Not Found"}"#),
        };
        assert_eq!(api_error_message(&raw), "Not Found");
    }

    #[test]
    fn error_message_falls_back_to_body_text() {
        let raw = RawResponse {
            status: 502,
            headers: HeaderMap::new(),
            body: bytes::Bytes::from_static(b"upstream connect error"),
        };
        assert_eq!(api_error_message(&raw), "upstream connect error");
    }
}
