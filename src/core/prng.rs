// Small PRNG for retry jitter.
//
// Not cryptographically secure. Seeded per process so clients that fail
// together do not retry in lockstep.

use core::time::Duration;

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Uniform-ish value in `0..bound`. Returns 0 for an empty range.
    #[inline]
    pub fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.next_u64() % bound
    }

    /// Random duration in `0..=max`, millisecond resolution.
    pub fn jitter(&mut self, max: Duration) -> Duration {
        let max_ms = max.as_millis().min(u64::MAX as u128) as u64;
        Duration::from_millis(self.below(max_ms.saturating_add(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_in_range() {
        let mut rng = Prng::new(42);
        let max = Duration::from_millis(250);
        for _ in 0..1000 {
            assert!(rng.jitter(max) <= max);
        }
        assert_eq!(rng.jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn zero_seed_is_not_stuck() {
        let mut rng = Prng::new(0);
        let a = rng.next_u64();
        let b = rng.next_u64();
        assert_ne!(a, b);
    }
}
