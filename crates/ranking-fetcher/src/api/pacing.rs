//! Adaptive inter-page pacing.
//!
//! Keeps a target delay between consecutive page requests: successful
//! fetches relax it multiplicatively, failures grow it, and both
//! directions clamp to configured bounds. The controller is plain state
//! with pure transitions; only `pause` touches the clock.

use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Stateful controller for the delay between page requests
#[derive(Debug)]
pub struct PacingController {
    current: Duration,
    min: Duration,
    max: Duration,
}

impl PacingController {
    /// Create a controller starting at `base`, clamped to `[min, max]`
    pub fn new(base: Duration, min: Duration, max: Duration) -> Self {
        Self {
            current: base.clamp(min, max),
            min,
            max,
        }
    }

    /// Relax the delay after a successful fetch
    pub fn on_success(&mut self) {
        self.current = self.current.mul_f64(0.9).max(self.min);
    }

    /// Grow the delay after a failed or absent page
    pub fn on_failure(&mut self) {
        self.current = (self.current * 2).min(self.max);
    }

    /// The current target delay between requests
    pub fn current_delay(&self) -> Duration {
        self.current
    }

    /// Sleep out the remainder of the target delay
    ///
    /// The target is a floor on inter-request spacing: a fetch that
    /// already took longer than the target is not delayed further.
    pub async fn pause(&self, elapsed: Duration) {
        let remaining = self.current.saturating_sub(elapsed);
        if !remaining.is_zero() {
            debug!(pause_ms = remaining.as_millis(), "Pacing before next page");
            sleep(remaining).await;
        }
    }
}
