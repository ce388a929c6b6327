//! Commit comparison with pagination and server-failure fallback.
//!
//! The provider's compare endpoint caps the file list it returns at a hard
//! limit per response. A comparison that reports exactly the cap cannot be
//! trusted as complete, so the full list is re-fetched page by page. When
//! the compare call itself dies with a server-side failure — which happens
//! on very large diffs — the same paginated listing runs with a much
//! smaller page size, and the caller-supplied base ref stands in for the
//! merge base the failed response would have carried.

use reqwest::header::HeaderMap;
use tracing::{debug, warn};

use crate::client::{GatedRestClient, RestRequest, RestResponse};
use crate::telemetry;
use crate::types::{CommitComparison, Comparison, FileChange};
use crate::Result;

/// The provider returns at most this many files per compare response; a
/// response that reaches it is assumed truncated.
pub const COMPARE_FILE_CAP: usize = 100;

/// Page size for the full file-list re-fetch.
pub const FILE_LIST_PAGE_SIZE: u32 = 100;

/// Page size for the server-failure fallback — small enough that the
/// server-side assembly that just failed is unlikely to fail again.
pub const FALLBACK_PAGE_SIZE: u32 = 3;

/// Commit comparison built on the gated REST client.
pub struct CompareClient {
    rest: GatedRestClient,
    owner: String,
    repo: String,
}

impl CompareClient {
    pub fn new(rest: GatedRestClient, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            rest,
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Compare two refs, returning the merge base and the complete list of
    /// changed files.
    ///
    /// Server-side failures (5xx) fall back to the paginated listing with
    /// [`FALLBACK_PAGE_SIZE`] and report `base` as the merge base; every
    /// other error class propagates unchanged.
    pub async fn compare_commits(&self, base: &str, head: &str) -> Result<CommitComparison> {
        let request = RestRequest::get(format!(
            "/repos/{}/{}/compare/{}...{}",
            self.owner, self.repo, base, head
        ));

        match self.rest.call::<Comparison>(request).await {
            Ok(response) => {
                let comparison = response.data;
                let merge_base_sha = comparison.merge_base_commit.sha;
                let files = if comparison.files.len() >= COMPARE_FILE_CAP {
                    metrics::counter!(telemetry::COMPARE_FALLBACKS_TOTAL, "reason" => "truncated")
                        .increment(1);
                    debug!(
                        base,
                        head,
                        count = comparison.files.len(),
                        "compare response at file cap; re-fetching full list"
                    );
                    self.fetch_all_files(base, head, FILE_LIST_PAGE_SIZE).await?
                } else {
                    comparison.files
                };
                Ok(CommitComparison {
                    merge_base_sha,
                    files,
                })
            }
            Err(e) if e.is_server_failure() => {
                metrics::counter!(telemetry::COMPARE_FALLBACKS_TOTAL, "reason" => "server_error")
                    .increment(1);
                warn!(base, head, error = %e, "compare failed server-side; paging with reduced size");
                let files = self.fetch_all_files(base, head, FALLBACK_PAGE_SIZE).await?;
                Ok(CommitComparison {
                    // The merge base from the failed response is unavailable;
                    // the caller's base ref is the best baseline we have.
                    merge_base_sha: base.to_owned(),
                    files,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch every page of the comparison's file list, following the `Link`
    /// header until no `rel="next"` remains.
    async fn fetch_all_files(
        &self,
        base: &str,
        head: &str,
        per_page: u32,
    ) -> Result<Vec<FileChange>> {
        let mut files = Vec::new();
        let mut page = 1u32;
        loop {
            let request = RestRequest::get(format!(
                "/repos/{}/{}/compare/{}...{}?per_page={}&page={}",
                self.owner, self.repo, base, head, per_page, page
            ));
            let response: RestResponse<Comparison> = self.rest.call(request).await?;
            files.extend(response.data.files);
            if !has_next_page(&response.headers) {
                break;
            }
            page += 1;
        }
        Ok(files)
    }
}

/// Whether a `Link` header advertises a `rel="next"` page.
///
/// Provider `Link` headers look like
/// `<https://api.example.com/...&page=2>; rel="next", <...&page=9>; rel="last"`.
pub(crate) fn has_next_page(headers: &HeaderMap) -> bool {
    let Some(link) = headers.get("link").and_then(|v| v.to_str().ok()) else {
        return false;
    };
    link.split(',').any(|part| {
        part.split(';').skip(1).any(|segment| {
            segment
                .trim()
                .strip_prefix("rel=")
                .is_some_and(|rel| rel.trim_matches('"') == "next")
        })
    })
}
