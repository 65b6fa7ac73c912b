//! Ranking feed downloader library.
//!
//! This library fetches a paginated JSON ranking feed page by page,
//! surviving transient failures, and archives the records as
//! newline-delimited JSON.

pub mod api;
pub mod driver;
pub mod sink;

pub use api::{
    Backoff, FetchError, PacingController, PageResult, RankingClient, RankingPage, RetryPolicy,
};
pub use driver::{FetchMode, RankingDriver, RunOptions, RunStats};
pub use sink::RecordSink;
