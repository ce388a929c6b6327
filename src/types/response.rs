//! Raw transport response envelope.

use bytes::Bytes;
use reqwest::header::HeaderMap;

/// An HTTP response as the transport saw it: status, headers, body bytes.
///
/// Transports return this for *every* response the server produced,
/// including 4xx/5xx and 304 — classification into success, revalidation,
/// or [`HeimdallError::Api`](crate::HeimdallError::Api) happens in the layer
/// that knows what the status means for its operation. Only network-level
/// failures (no response at all) surface as transport errors.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, preserved verbatim.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether this is a `304 Not Modified` revalidation answer.
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    /// Get a header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
