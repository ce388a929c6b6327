//! Disk-backed, conditionally-revalidated avatar cache.
//!
//! Avatar URLs served through a GitHub Enterprise avatar proxy are expensive
//! to refetch and sit behind authenticated endpoints, so the extension host
//! cannot just hand them to an image widget. [`AvatarCache`] fetches them
//! once, stores the bytes under an extension-private directory, and serves
//! them back as base64 data URIs, revalidating with `if-none-match` /
//! `if-modified-since` when the stored response goes stale per its
//! `cache-control` headers.
//!
//! # State model
//!
//! Cache state is an explicit map `authority -> AuthorityState { loaded,
//! dirty, entries }`, owned by the cache instance. Each authority has its
//! own meta file (`.meta.json`) and body files named by the SHA-256 of the
//! cache key. A lookup is a tagged state machine — `Fresh`, `Stale`,
//! `Miss`, `Corrupt` — never exception-as-control-flow; corrupt entries
//! self-heal by dropping the entry and refetching cold.
//!
//! # Concurrency
//!
//! Network fetches run inside a bounded FIFO queue of
//! [`ENTERPRISE_FETCH_CONCURRENCY`] permits, separate from the request
//! gate, so background image downloads cannot starve interactive API calls.
//! Concurrent lookups for the same key are not deduplicated; the meta file
//! is last-writer-wins, which is sound because avatar fetches are
//! idempotent.

mod freshness;
mod meta;
mod store;

pub use freshness::{expires_at, is_fresh, parse_http_date, CacheControl};
pub use meta::{body_file_name, content_extension, StoredHeaders, META_FILE};
pub use store::{BlobStore, FsBlobStore};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};
use url::Url;

use crate::telemetry;
use crate::types::RawResponse;
use crate::Result;

use meta::AuthorityState;

/// Maximum concurrent avatar fetches; admission beyond this queues FIFO.
pub const ENTERPRISE_FETCH_CONCURRENCY: usize = 3;

/// Conditional request headers for a revalidation fetch.
#[derive(Debug, Clone, Default)]
pub struct ConditionalHeaders {
    /// `if-none-match`, from the stored `etag`.
    pub if_none_match: Option<String>,
    /// `if-modified-since`, from the stored `last-modified`.
    pub if_modified_since: Option<String>,
}

impl ConditionalHeaders {
    /// No conditions — a cold fetch.
    pub fn none() -> Self {
        Self::default()
    }

    fn from_stored(stored: &StoredHeaders) -> Self {
        Self {
            if_none_match: stored.etag.clone(),
            if_modified_since: stored.last_modified.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.if_none_match.is_none() && self.if_modified_since.is_none()
    }
}

/// The transport boundary for avatar downloads.
///
/// 304 and error statuses come back as normal responses; `Err` is reserved
/// for network-level failures.
#[async_trait]
pub trait AvatarTransport: Send + Sync {
    async fn fetch(&self, url: &str, conditional: &ConditionalHeaders) -> Result<RawResponse>;
}

/// Configuration for [`AvatarCache`].
#[derive(Debug, Clone)]
pub struct AvatarCacheConfig {
    /// Storage root; one sub-directory per remote authority.
    pub root: PathBuf,
    /// The GitHub Enterprise host whose avatar proxy this cache serves,
    /// e.g. `github.example.com`. With no host configured, every URL
    /// passes through unproxied.
    pub enterprise_host: Option<String>,
}

impl Default for AvatarCacheConfig {
    fn default() -> Self {
        Self {
            root: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("heimdall")
                .join("avatars"),
            enterprise_host: None,
        }
    }
}

impl AvatarCacheConfig {
    /// Create a config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage root.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the enterprise host whose avatar proxy should be cached.
    pub fn enterprise_host(mut self, host: impl Into<String>) -> Self {
        self.enterprise_host = Some(host.into());
        self
    }
}

/// Outcome of a cache lookup, before any network activity.
#[derive(Debug)]
enum Lookup {
    /// Stored response still fresh; serve it without touching the network.
    Fresh {
        content: Vec<u8>,
        content_type: Option<String>,
    },
    /// Stored but expired; revalidate with the given conditional headers.
    Stale {
        content: Vec<u8>,
        content_type: Option<String>,
        conditional: ConditionalHeaders,
    },
    /// No entry for this key.
    Miss,
    /// Entry present but its body is unreadable; the entry has been dropped.
    Corrupt,
}

/// Disk-backed avatar cache with HTTP freshness and conditional
/// revalidation. See the module docs for the state model.
pub struct AvatarCache {
    transport: Arc<dyn AvatarTransport>,
    store: Arc<dyn BlobStore>,
    config: AvatarCacheConfig,
    authorities: Mutex<HashMap<String, AuthorityState>>,
    fetch_slots: Semaphore,
}

impl AvatarCache {
    pub fn new(
        transport: Arc<dyn AvatarTransport>,
        store: Arc<dyn BlobStore>,
        config: AvatarCacheConfig,
    ) -> Self {
        Self {
            transport,
            store,
            config,
            authorities: Mutex::new(HashMap::new()),
            fetch_slots: Semaphore::new(ENTERPRISE_FETCH_CONCURRENCY),
        }
    }

    /// Resolve an avatar URL to something an image widget can load.
    ///
    /// URLs outside the configured enterprise avatar proxy are returned
    /// unchanged — public CDNs and data URIs need no proxying. Proxied URLs
    /// resolve to a base64 data URI from cache or network, or `None` when
    /// nothing could be fetched. Never returns an error: cache corruption
    /// self-heals and network failures degrade to `None`.
    pub async fn avatar_url(&self, raw_url: &str) -> Option<String> {
        let Ok(url) = Url::parse(raw_url) else {
            return Some(raw_url.to_owned());
        };
        if !self.is_proxied(&url) {
            return Some(raw_url.to_owned());
        }
        self.resolve_proxied(&url).await
    }

    /// Drop an authority's cached bodies and meta file from disk.
    pub async fn clear_authority(&self, authority: &str) -> Result<()> {
        let mut authorities = self.authorities.lock().await;
        authorities.remove(authority);
        self.store
            .remove_dir_all(&self.config.root.join(authority))
            .await?;
        Ok(())
    }

    fn proxy_authority(&self) -> Option<String> {
        self.config
            .enterprise_host
            .as_deref()
            .map(|host| format!("avatars.{host}"))
    }

    /// Only URLs on the recognized avatar proxy sub-domain of the
    /// configured enterprise host go through the cache.
    fn is_proxied(&self, url: &Url) -> bool {
        match (url.host_str(), self.proxy_authority()) {
            (Some(host), Some(proxy)) => host.eq_ignore_ascii_case(&proxy),
            _ => false,
        }
    }

    async fn resolve_proxied(&self, url: &Url) -> Option<String> {
        let authority = url.host_str()?.to_ascii_lowercase();
        let cache_key = cache_key_for(url);

        let result = match self.lookup(&authority, &cache_key).await {
            Lookup::Fresh {
                content,
                content_type,
            } => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "kind" => "fresh").increment(1);
                Some(data_uri(content_type.as_deref(), &content))
            }
            Lookup::Stale {
                content,
                content_type,
                conditional,
            } => {
                self.fetch_and_store(
                    &authority,
                    &cache_key,
                    url,
                    conditional,
                    Some((content, content_type)),
                )
                .await
            }
            Lookup::Miss | Lookup::Corrupt => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                self.fetch_and_store(&authority, &cache_key, url, ConditionalHeaders::none(), None)
                    .await
            }
        };

        self.persist_if_dirty(&authority).await;
        result
    }

    /// Classify the cached state for one key, reading meta and body as
    /// needed. Drops corrupt entries (unreadable body) from the in-memory
    /// map and marks the authority dirty so the drop persists.
    async fn lookup(&self, authority: &str, cache_key: &str) -> Lookup {
        let stored = {
            let mut authorities = self.authorities.lock().await;
            let state = authorities.entry(authority.to_owned()).or_default();
            if !state.loaded {
                state.entries = self.read_meta(authority).await;
                state.loaded = true;
            }
            match state.entries.get(cache_key) {
                Some(stored) => stored.clone(),
                None => return Lookup::Miss,
            }
        };

        let path = self.body_path(authority, cache_key, stored.content_type.as_deref());
        match self.store.read(&path).await {
            Ok(content) => {
                if is_fresh(&stored, SystemTime::now()) {
                    Lookup::Fresh {
                        content,
                        content_type: stored.content_type,
                    }
                } else {
                    Lookup::Stale {
                        content,
                        content_type: stored.content_type.clone(),
                        conditional: ConditionalHeaders::from_stored(&stored),
                    }
                }
            }
            Err(e) => {
                debug!(authority, cache_key, error = %e, "cached avatar body unreadable; dropping entry");
                let mut authorities = self.authorities.lock().await;
                if let Some(state) = authorities.get_mut(authority) {
                    state.entries.remove(cache_key);
                    state.dirty = true;
                }
                Lookup::Corrupt
            }
        }
    }

    /// Fetch (conditionally, when revalidating) inside the bounded queue
    /// and fold the response into the cache.
    async fn fetch_and_store(
        &self,
        authority: &str,
        cache_key: &str,
        url: &Url,
        conditional: ConditionalHeaders,
        cached: Option<(Vec<u8>, Option<String>)>,
    ) -> Option<String> {
        let _permit = self.fetch_slots.acquire().await.ok()?;

        let response = match self.transport.fetch(url.as_str(), &conditional).await {
            Ok(response) => response,
            Err(e) => {
                debug!(authority, cache_key, error = %e, "avatar fetch failed");
                return None;
            }
        };

        if response.is_success() {
            let headers = StoredHeaders::from_response(&response.headers);
            let content = response.body.to_vec();
            self.write_body(authority, cache_key, &headers, &content)
                .await;
            let uri = data_uri(headers.content_type.as_deref(), &content);
            self.record_entry(authority, cache_key, headers, false).await;
            Some(uri)
        } else if response.is_not_modified() {
            let (content, content_type) = cached?;
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "kind" => "revalidated").increment(1);
            let update = StoredHeaders::from_response(&response.headers);
            self.record_entry(authority, cache_key, update, true).await;
            Some(data_uri(content_type.as_deref(), &content))
        } else {
            debug!(
                authority,
                cache_key,
                status = response.status,
                "avatar fetch produced no usable result"
            );
            None
        }
    }

    /// Write a body file immediately; failures degrade the entry to
    /// network-only (logged, not surfaced).
    async fn write_body(
        &self,
        authority: &str,
        cache_key: &str,
        headers: &StoredHeaders,
        content: &[u8],
    ) {
        let dir = self.config.root.join(authority);
        if let Err(e) = self.store.create_dir_all(&dir).await {
            warn!(authority, error = %e, "could not create avatar cache directory");
            return;
        }
        let path = self.body_path(authority, cache_key, headers.content_type.as_deref());
        if let Err(e) = self.store.write(&path, content).await {
            warn!(authority, cache_key, error = %e, "could not write avatar body");
        }
    }

    /// Record new or refreshed headers for a key and mark the authority for
    /// a meta rewrite. `merge` distinguishes a 304 header refresh from a
    /// full replacement.
    async fn record_entry(
        &self,
        authority: &str,
        cache_key: &str,
        headers: StoredHeaders,
        merge: bool,
    ) {
        let mut authorities = self.authorities.lock().await;
        let state = authorities.entry(authority.to_owned()).or_default();
        if merge {
            state
                .entries
                .entry(cache_key.to_owned())
                .or_default()
                .merge(&headers);
        } else {
            state.entries.insert(cache_key.to_owned(), headers);
        }
        state.dirty = true;
    }

    /// Rewrite the authority's meta file when its entries have diverged
    /// from disk. Held under the state lock: concurrent lookups serialize
    /// here and the last writer wins.
    async fn persist_if_dirty(&self, authority: &str) {
        let mut authorities = self.authorities.lock().await;
        let Some(state) = authorities.get_mut(authority) else {
            return;
        };
        if !state.dirty {
            return;
        }
        let json = match serde_json::to_vec_pretty(&state.entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(authority, error = %e, "could not serialize avatar meta");
                return;
            }
        };
        let dir = self.config.root.join(authority);
        if let Err(e) = self.store.create_dir_all(&dir).await {
            warn!(authority, error = %e, "could not create avatar cache directory");
            return;
        }
        if let Err(e) = self.store.write(&dir.join(META_FILE), &json).await {
            warn!(authority, error = %e, "could not write avatar meta file");
            return;
        }
        state.dirty = false;
    }

    /// Read and parse an authority's meta file; any failure is an empty
    /// cache, never fatal.
    async fn read_meta(&self, authority: &str) -> HashMap<String, StoredHeaders> {
        let path = self.config.root.join(authority).join(META_FILE);
        let bytes = match self.store.read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(authority, error = %e, "avatar meta file unreadable; starting cold");
                HashMap::new()
            }
        }
    }

    fn body_path(&self, authority: &str, cache_key: &str, content_type: Option<&str>) -> PathBuf {
        self.config
            .root
            .join(authority)
            .join(body_file_name(cache_key, content_type))
    }
}

/// Cache key for a proxied URL: path plus query, the part that varies per
/// avatar.
fn cache_key_for(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_owned(),
    }
}

/// Encode cached bytes as a data URI for direct use in an image reference.
fn data_uri(content_type: Option<&str>, content: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        content_type.unwrap_or("application/octet-stream"),
        STANDARD.encode(content)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_includes_query() {
        let url = Url::parse("https://avatars.ghe.example.com/u/42?s=64").unwrap();
        assert_eq!(cache_key_for(&url), "/u/42?s=64");

        let url = Url::parse("https://avatars.ghe.example.com/u/42").unwrap();
        assert_eq!(cache_key_for(&url), "/u/42");
    }

    #[test]
    fn data_uri_encoding() {
        assert_eq!(
            data_uri(Some("image/png"), b"abc"),
            "data:image/png;base64,YWJj"
        );
        assert_eq!(
            data_uri(None, b""),
            "data:application/octet-stream;base64,"
        );
    }

    #[test]
    fn conditional_headers_from_stored() {
        let stored = StoredHeaders {
            etag: Some("\"v1\"".to_owned()),
            ..StoredHeaders::default()
        };
        let conditional = ConditionalHeaders::from_stored(&stored);
        assert_eq!(conditional.if_none_match.as_deref(), Some("\"v1\""));
        assert!(conditional.if_modified_since.is_none());
        assert!(!conditional.is_empty());
        assert!(ConditionalHeaders::none().is_empty());
    }
}
