//! Stored response headers and cache entry naming.
//!
//! Each remote authority owns one meta file — a JSON map from cache key to
//! the [`StoredHeaders`] of the last successful or revalidated fetch —
//! rewritten whole whenever any entry changes. Bodies live next to it,
//! named by the SHA-256 of the cache key plus an extension picked from a
//! fixed content-type table.

use std::collections::HashMap;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// File name of the per-authority header map.
pub const META_FILE: &str = ".meta.json";

/// Response headers retained for one cached body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHeaders {
    #[serde(rename = "content-type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "cache-control", default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(rename = "last-modified", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl StoredHeaders {
    /// Capture the retained header subset from a response.
    pub fn from_response(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        Self {
            content_type: get("content-type"),
            cache_control: get("cache-control"),
            etag: get("etag"),
            last_modified: get("last-modified"),
            date: get("date"),
        }
    }

    /// Merge a revalidation response's headers into this stored set.
    ///
    /// A 304 may refresh any subset of the retained headers (typically
    /// `etag` and `date`); fields the response omitted keep their stored
    /// values.
    pub fn merge(&mut self, update: &StoredHeaders) {
        if update.content_type.is_some() {
            self.content_type = update.content_type.clone();
        }
        if update.cache_control.is_some() {
            self.cache_control = update.cache_control.clone();
        }
        if update.etag.is_some() {
            self.etag = update.etag.clone();
        }
        if update.last_modified.is_some() {
            self.last_modified = update.last_modified.clone();
        }
        if update.date.is_some() {
            self.date = update.date.clone();
        }
    }
}

/// In-memory cache state for one remote authority.
///
/// `loaded` tracks whether the meta file has been read since this state was
/// created; `dirty` tracks whether the entries map has diverged from disk.
/// Both are per-authority by construction — switching authorities cannot
/// invalidate another authority's state.
#[derive(Debug, Default)]
pub struct AuthorityState {
    pub loaded: bool,
    pub dirty: bool,
    pub entries: HashMap<String, StoredHeaders>,
}

/// Pick a file extension for a cached body from its content type.
///
/// Unknown or absent types fall back to `bin`.
pub fn content_extension(content_type: Option<&str>) -> &'static str {
    // Strip any parameters ("image/png; charset=...").
    let essence = content_type
        .map(|c| c.split(';').next().unwrap_or(c).trim())
        .unwrap_or("");
    match essence {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}

/// File name for a cached body: SHA-256 of the cache key plus extension.
pub fn body_file_name(cache_key: &str, content_type: Option<&str>) -> String {
    let digest = Sha256::digest(cache_key.as_bytes());
    format!("{}.{}", hex::encode(digest), content_extension(content_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn captures_retained_subset() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("image/png"));
        headers.insert("cache-control", HeaderValue::from_static("max-age=300"));
        headers.insert("etag", HeaderValue::from_static("\"v1\""));
        headers.insert("x-frame-options", HeaderValue::from_static("deny"));

        let stored = StoredHeaders::from_response(&headers);
        assert_eq!(stored.content_type.as_deref(), Some("image/png"));
        assert_eq!(stored.cache_control.as_deref(), Some("max-age=300"));
        assert_eq!(stored.etag.as_deref(), Some("\"v1\""));
        assert!(stored.last_modified.is_none());
    }

    #[test]
    fn merge_refreshes_only_present_fields() {
        let mut stored = StoredHeaders {
            content_type: Some("image/png".to_owned()),
            cache_control: Some("max-age=300".to_owned()),
            etag: Some("\"v1\"".to_owned()),
            last_modified: Some("Sun, 06 Nov 1994 08:49:37 GMT".to_owned()),
            date: Some("Sun, 06 Nov 1994 08:49:37 GMT".to_owned()),
        };
        stored.merge(&StoredHeaders {
            etag: Some("\"v2\"".to_owned()),
            date: Some("Mon, 07 Nov 1994 08:49:37 GMT".to_owned()),
            ..StoredHeaders::default()
        });

        assert_eq!(stored.etag.as_deref(), Some("\"v2\""));
        assert_eq!(stored.date.as_deref(), Some("Mon, 07 Nov 1994 08:49:37 GMT"));
        // Untouched fields survive.
        assert_eq!(stored.content_type.as_deref(), Some("image/png"));
        assert_eq!(stored.cache_control.as_deref(), Some("max-age=300"));
    }

    #[test]
    fn meta_map_serde_round_trip() {
        let mut entries = HashMap::new();
        entries.insert(
            "/u/123?v=4".to_owned(),
            StoredHeaders {
                content_type: Some("image/jpeg".to_owned()),
                etag: Some("\"abc\"".to_owned()),
                ..StoredHeaders::default()
            },
        );

        let json = serde_json::to_string(&entries).unwrap();
        assert!(json.contains("content-type"));
        assert!(!json.contains("last-modified"), "absent fields are omitted");

        let decoded: HashMap<String, StoredHeaders> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn extension_table() {
        assert_eq!(content_extension(Some("image/png")), "png");
        assert_eq!(content_extension(Some("image/jpeg")), "jpg");
        assert_eq!(content_extension(Some("image/svg+xml")), "svg");
        assert_eq!(content_extension(Some("image/png; charset=binary")), "png");
        assert_eq!(content_extension(Some("application/json")), "bin");
        assert_eq!(content_extension(None), "bin");
    }

    #[test]
    fn body_names_are_stable_and_keyed() {
        let a = body_file_name("/u/1", Some("image/png"));
        let b = body_file_name("/u/1", Some("image/png"));
        let c = body_file_name("/u/2", Some("image/png"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.ends_with(".png"));
        // 64 hex chars + dot + ext
        assert_eq!(a.len(), 64 + 4);
    }
}
