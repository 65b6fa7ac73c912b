//! Ranking endpoint response types.
//!
//! These types represent the JSON envelope returned by the ranking feed.
//! Records themselves stay opaque; only the envelope structure is read.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outer envelope wrapping each page's records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEnvelope {
    pub rankings: RankingPage,
}

/// One page of ranking records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingPage {
    /// Ranking records in source order, passed through verbatim
    pub data: Vec<Value>,
    /// Total page count; authoritative only on page 1's response
    pub last_page: u32,
}
