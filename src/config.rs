//! Run-level tuning: wait timeouts and the between-iteration backoff.

use std::ops::Range;
use std::time::Duration;

use rand::Rng;

/// Default bounded wait for required elements.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(15);

/// Shorter wait for optional UI (popups, menus, panels).
pub const SHORT_WAIT: Duration = Duration::from_secs(5);

/// Randomized pause between iterations. Failures back off longer than
/// successes so the request pattern does not look like a tight retry burst.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub after_success: Range<Duration>,
    pub after_failure: Range<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            after_success: Duration::from_secs(2)..Duration::from_secs(5),
            after_failure: Duration::from_secs(5)..Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    /// Fixed ranges, mostly for tests that cannot afford real seconds.
    pub fn uniform(after_success: Range<Duration>, after_failure: Range<Duration>) -> Self {
        Self {
            after_success,
            after_failure,
        }
    }

    pub fn delay<R: Rng + ?Sized>(&self, rng: &mut R, failed: bool) -> Duration {
        let range = if failed {
            self.after_failure.clone()
        } else {
            self.after_success.clone()
        };
        if range.start >= range.end {
            return range.start;
        }
        rng.gen_range(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn failure_delays_exceed_success_delays() {
        let mut rng = StdRng::seed_from_u64(42);
        let policy = BackoffPolicy::default();
        for _ in 0..50 {
            let ok = policy.delay(&mut rng, false);
            let bad = policy.delay(&mut rng, true);
            assert!(ok >= Duration::from_secs(2) && ok < Duration::from_secs(5));
            assert!(bad >= Duration::from_secs(5) && bad < Duration::from_secs(10));
        }
    }

    #[test]
    fn degenerate_range_returns_its_start() {
        let mut rng = StdRng::seed_from_u64(1);
        let zero = Duration::ZERO..Duration::ZERO;
        let policy = BackoffPolicy::uniform(zero.clone(), zero);
        assert_eq!(policy.delay(&mut rng, true), Duration::ZERO);
    }
}
