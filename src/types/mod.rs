//! Public types for the heimdall API.

mod compare;
mod rate_limit;
mod response;

pub use compare::{CommitComparison, CommitRef, Comparison, FileChange};
pub use rate_limit::RateLimitSample;
pub use response::RawResponse;
