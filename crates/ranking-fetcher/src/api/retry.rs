//! Per-attempt retry backoff policies.
//!
//! One parameterized policy covers every run mode: the client applies it
//! between attempts at the same page, regardless of how pages are scheduled.

use std::time::Duration;

/// Retry policy applied to every page fetch
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts per page, including the first
    pub max_attempts: u32,
    /// Delay schedule between attempts
    pub backoff: Backoff,
}

/// Delay schedule between retry attempts
///
/// Linear backoff suits the paced single-stream modes; the capped
/// exponential variant is used with the worker pool, where inter-page
/// pacing is replaced by the pool width.
#[derive(Debug, Clone, Copy)]
pub enum Backoff {
    /// Delay after failed attempt `k` is `base * k`
    Linear { base: Duration },
    /// Delay after failed attempt `k` is `min(base * 2^(k-1), max)`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Linear { base } => base.saturating_mul(attempt),
            Backoff::Exponential { base, max } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(max)
            }
        }
    }
}
