//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Consecutive-failure backoff.
///
/// Delays double from `base` up to `max`, with up to 10% jitter added.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        self.failures = self.failures.saturating_add(1);
        calculate_backoff(self.failures, self.base, self.max)
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u32.saturating_pow(attempt - 1);
    let capped_delay = base.saturating_mul(exponential_base).min(max);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay.as_micros() as u64 / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    capped_delay + Duration::from_micros(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(2000);

        assert_eq!(calculate_backoff(0, base, max), Duration::ZERO);

        let b1 = calculate_backoff(1, base, max);
        assert!(b1 >= Duration::from_millis(100) && b1 < Duration::from_millis(111));

        let b2 = calculate_backoff(2, base, max);
        assert!(b2 >= Duration::from_millis(200));

        let capped = calculate_backoff(10, base, Duration::from_millis(1000));
        assert!(capped >= Duration::from_millis(1000));
        assert!(capped <= Duration::from_millis(1100));
    }

    #[test]
    fn counts_and_resets_failures() {
        let mut backoff = Backoff::new(Duration::from_millis(5), Duration::from_secs(1));
        let first = backoff.next_delay();
        let second = backoff.next_delay();
        assert_eq!(backoff.failures(), 2);
        assert!(second >= first);

        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert!(backoff.next_delay() < Duration::from_millis(6));
    }

    #[test]
    fn huge_attempt_counts_saturate() {
        let delay = calculate_backoff(u32::MAX, Duration::from_millis(5), Duration::from_secs(1));
        assert!(delay >= Duration::from_secs(1));
    }
}
