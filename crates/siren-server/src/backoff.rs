//! Cooldown for a failing upstream provider.
//!
//! After a failed fetch the provider is skipped until the cooldown expires,
//! so requests go straight to the degraded path instead of waiting out
//! another timeout. Each consecutive failure doubles the cooldown up to a cap.

use rand::Rng;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    next_attempt_at: Instant,
    failures: u32,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            max: max.max(base),
            current: base,
            next_attempt_at: Instant::now(),
            failures: 0,
            jitter_ratio: 0.2,
        }
    }

    /// Whether the upstream may be called now.
    pub fn ready(&self) -> bool {
        Instant::now() >= self.next_attempt_at
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn succeed(&mut self) {
        self.current = self.base;
        self.failures = 0;
        self.next_attempt_at = Instant::now();
    }

    /// Record a failure and return the cooldown before the next attempt.
    pub fn fail(&mut self) -> Duration {
        let cooldown = if self.failures == 0 {
            self.base
        } else {
            self.current.saturating_mul(2).min(self.max)
        };
        self.current = cooldown;
        self.failures = self.failures.saturating_add(1);
        let delay = with_jitter(cooldown, self.jitter_ratio);
        self.next_attempt_at = Instant::now() + delay;
        delay
    }
}

fn with_jitter(delay: Duration, ratio: f64) -> Duration {
    let spread_ms = (delay.as_millis() as f64 * ratio.clamp(0.0, 1.0)) as u64;
    if spread_ms == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::rng().random_range(0..=spread_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_backoff_allows_calls() {
        let backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1));
        assert!(backoff.ready());
        assert_eq!(backoff.failures(), 0);
    }

    #[test]
    fn failure_blocks_until_success() {
        let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(5));
        let delay = backoff.fail();
        assert!(delay >= Duration::from_millis(500));
        assert!(delay <= Duration::from_millis(600));
        assert!(!backoff.ready());

        backoff.succeed();
        assert!(backoff.ready());
        assert_eq!(backoff.failures(), 0);
    }

    #[test]
    fn cooldown_doubles_and_caps() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(300));
        backoff.fail();
        let second = backoff.fail();
        assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(240));
        let third = backoff.fail();
        assert!(third >= Duration::from_millis(300) && third <= Duration::from_millis(360));
        assert_eq!(backoff.failures(), 3);
    }
}
