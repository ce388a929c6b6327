//! Heimdall - Resilient access layer for Git hosting provider APIs
//!
//! This crate is the single choke point between a GitHub-integrated
//! extension host and the provider's network surface. Every REST and
//! GraphQL call passes through a fixed-capacity admission gate
//! ([`Bulkhead`]) and reports its remaining rate-limit budget to a shared
//! [`RateLimitTracker`]; avatar images resolve through a disk-backed,
//! conditionally-revalidated cache ([`AvatarCache`]); and commit
//! comparisons ([`CompareClient`]) transparently recover from truncated and
//! failed compare responses via paginated re-fetching.
//!
//! Transports are traits ([`client::RestTransport`],
//! [`client::GraphQlTransport`], [`cache::AvatarTransport`]); the
//! [`providers`] module ships a reqwest-backed implementation of all three
//! for GitHub-compatible hosts.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use heimdall::providers::{HttpTransport, HttpTransportConfig};
//! use heimdall::{Bulkhead, CompareClient, GatedRestClient, RateLimitTracker};
//!
//! #[tokio::main]
//! async fn main() -> heimdall::Result<()> {
//!     let transport = Arc::new(HttpTransport::new(
//!         HttpTransportConfig::new("https://api.github.com").token("ghp_example"),
//!     )?);
//!     let gate = Arc::new(Bulkhead::new(heimdall::notify::null_notifier()));
//!     let tracker = Arc::new(RateLimitTracker::new());
//!
//!     let rest = GatedRestClient::new(transport, gate, tracker);
//!     let compare = CompareClient::new(rest, "rust-lang", "rust");
//!     let comparison = compare.compare_commits("main", "beta").await?;
//!     println!("{} files changed", comparison.files.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod compare;
pub mod error;
pub mod gate;
pub mod notify;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{AvatarCache, AvatarCacheConfig};
pub use client::{GatedGraphQlClient, GatedRestClient};
pub use compare::CompareClient;
pub use error::{HeimdallError, Result};
pub use gate::{Bulkhead, OverloadPolicy, RateLimitTracker};
pub use notify::{Notifier, NullNotifier};

// Re-export common data types
pub use types::{CommitComparison, FileChange, RateLimitSample, RawResponse};
