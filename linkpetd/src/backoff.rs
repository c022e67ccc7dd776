//! Poll retry delay.
//!
//! On success the driver polls at the normal cadence. Each consecutive
//! failure doubles the wait, up to a ceiling, and adds up to 25% jitter.

use std::time::Duration;

use linkpet::prng::Prng;

#[derive(Debug, Clone)]
pub struct PollBackoff {
    base: Duration,
    max: Duration,
    failures: u32,
    rng: Prng,
}

impl PollBackoff {
    pub fn new(base: Duration, max: Duration, seed: u64) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: 0,
            rng: Prng::new(seed),
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay until the next poll after a successful one.
    pub fn succeeded(&mut self) -> Duration {
        self.failures = 0;
        self.base
    }

    /// Records a failure and returns the delay until the retry.
    pub fn failed(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        let factor = 1u32 << self.failures.min(16);
        let delay = self.base.saturating_mul(factor).min(self.max);
        delay + self.rng.jitter(delay / 4)
    }
}
