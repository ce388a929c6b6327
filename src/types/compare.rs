//! Commit comparison payload types.

use serde::Deserialize;

/// A single changed file in a commit comparison.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileChange {
    /// Path of the file in the head commit.
    pub filename: String,
    /// Change kind as reported by the provider ("added", "modified",
    /// "removed", "renamed", ...).
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
    /// Unified diff hunk, omitted by the provider for binary or oversized
    /// files.
    #[serde(default)]
    pub patch: Option<String>,
    /// Previous path for renames.
    #[serde(default)]
    pub previous_filename: Option<String>,
}

/// A bare commit reference inside a comparison payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// Wire shape of the provider's compare endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Comparison {
    /// The merge base between the two compared refs.
    pub merge_base_commit: CommitRef,
    /// Changed files; capped by the provider at a hard limit per response.
    #[serde(default)]
    pub files: Vec<FileChange>,
    #[serde(default)]
    pub total_commits: u64,
}

/// The result callers get back from
/// [`CompareClient::compare_commits`](crate::compare::CompareClient::compare_commits).
#[derive(Debug, Clone)]
pub struct CommitComparison {
    /// The diff baseline: the merge base when the compare call succeeded,
    /// or the caller-supplied base ref when the paginated fallback ran.
    pub merge_base_sha: String,
    /// The complete file list, re-fetched page by page when the single
    /// compare response hit the provider cap.
    pub files: Vec<FileChange>,
}
