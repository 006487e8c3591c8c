//! Rate-limit backoff state
//!
//! A single integer multiplier applied to the scrape interval. Doubled each
//! time the provider signals request-quota exhaustion, reset to one on any
//! fully successful fetch cycle. Owned by the reconciliation engine and
//! mutated only on its own task.

/// Backoff multiplier for the end-of-cycle sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    multiplier: u32,
}

impl Backoff {
    /// Start at the neutral multiplier of one.
    pub fn new() -> Self {
        Self { multiplier: 1 }
    }

    /// Current multiplier, always >= 1.
    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Double the multiplier after a rate-limit failure. Saturates rather
    /// than wrapping under a sustained outage.
    pub fn escalate(&mut self) {
        self.multiplier = self.multiplier.saturating_mul(2);
    }

    /// Return to the neutral multiplier after a successful fetch cycle.
    pub fn reset(&mut self) {
        self.multiplier = 1;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
