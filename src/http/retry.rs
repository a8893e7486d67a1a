//! Retry policy
//!
//! An ordered list of rules, each pairing an error predicate with a backoff
//! shape and an attempt cap. The first rule whose predicate matches a failure
//! decides whether (and how long) to wait before the next attempt. Attempts
//! are counted per rule.

use crate::error::Error;
use std::time::Duration;

/// Delay shape between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay every time
    Constant(Duration),
    /// `factor * base^n` for the n-th retry (n starting at 0)
    Exponential {
        /// Delay of the first retry
        factor: Duration,
        /// Growth base
        base: u32,
        /// Upper bound for a single delay
        max: Option<Duration>,
    },
}

impl Backoff {
    /// Constant backoff
    pub fn constant(delay: Duration) -> Self {
        Self::Constant(delay)
    }

    /// Exponential backoff with base 2 and no cap
    pub fn exponential(factor: Duration) -> Self {
        Self::Exponential {
            factor,
            base: 2,
            max: None,
        }
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Constant(delay) => delay,
            Backoff::Exponential { factor, base, max } => {
                let multiplier = base.saturating_pow(retry);
                let delay = factor.saturating_mul(multiplier);
                max.map_or(delay, |max| delay.min(max))
            }
        }
    }
}

/// A single retry rule
#[derive(Debug, Clone, Copy)]
pub struct RetryRule {
    /// Name used in logs
    pub name: &'static str,
    /// Which errors this rule handles
    pub predicate: fn(&Error) -> bool,
    /// Delay shape
    pub backoff: Backoff,
    /// Total attempts allowed (first try included)
    pub max_attempts: u32,
}

impl RetryRule {
    /// Rule for server-driven throttling (HTTP 429/503)
    pub fn rate_limited(backoff: Backoff, max_attempts: u32) -> Self {
        Self {
            name: "rate_limited",
            predicate: |e| matches!(e, Error::RateLimited { .. }),
            backoff,
            max_attempts,
        }
    }

    /// Rule for the analytics lock (HTTP 423)
    pub fn metrics_throttled(backoff: Backoff, max_attempts: u32) -> Self {
        Self {
            name: "metrics_throttled",
            predicate: |e| matches!(e, Error::MetricsThrottled { .. }),
            backoff,
            max_attempts,
        }
    }

    /// Check whether this rule handles the error
    pub fn matches(&self, error: &Error) -> bool {
        (self.predicate)(error)
    }
}

/// Ordered retry rules
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    rules: Vec<RetryRule>,
}

impl RetryPolicy {
    /// Policy without any rules (every error propagates)
    pub fn new() -> Self {
        Self::default()
    }

    /// Front defaults: 429/503 exponential (2s, 4s, 8s, ...) up to 10
    /// attempts, 423 every 60s up to 5 attempts
    pub fn front_default() -> Self {
        Self::new()
            .with_rule(RetryRule::metrics_throttled(
                Backoff::constant(Duration::from_secs(60)),
                5,
            ))
            .with_rule(RetryRule::rate_limited(
                Backoff::exponential(Duration::from_secs(2)),
                10,
            ))
    }

    /// Append a rule
    #[must_use]
    pub fn with_rule(mut self, rule: RetryRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Configured rules
    pub fn rules(&self) -> &[RetryRule] {
        &self.rules
    }

    /// Start tracking attempts for one logical call
    pub fn tracker(&self) -> RetryTracker<'_> {
        RetryTracker {
            policy: self,
            failures: vec![0; self.rules.len()],
        }
    }
}

/// Per-call attempt counters
#[derive(Debug)]
pub struct RetryTracker<'a> {
    policy: &'a RetryPolicy,
    failures: Vec<u32>,
}

impl RetryTracker<'_> {
    /// Record a failure. Returns the delay before the next attempt, or `None`
    /// when the error must be propagated.
    pub fn next_delay(&mut self, error: &Error) -> Option<(&'static str, u32, Duration)> {
        let (idx, rule) = self
            .policy
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(error))?;

        self.failures[idx] += 1;
        let failures = self.failures[idx];
        if failures >= rule.max_attempts {
            return None;
        }

        Some((rule.name, failures, rule.backoff.delay(failures - 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_limited() -> Error {
        Error::RateLimited {
            status: 429,
            body: String::new(),
        }
    }

    fn throttled() -> Error {
        Error::MetricsThrottled {
            body: String::new(),
        }
    }

    #[test]
    fn test_exponential_delays() {
        let backoff = Backoff::exponential(Duration::from_secs(2));
        assert_eq!(backoff.delay(0), Duration::from_secs(2));
        assert_eq!(backoff.delay(1), Duration::from_secs(4));
        assert_eq!(backoff.delay(2), Duration::from_secs(8));
        assert_eq!(backoff.delay(8), Duration::from_secs(512));
    }

    #[test]
    fn test_exponential_cap() {
        let backoff = Backoff::Exponential {
            factor: Duration::from_secs(2),
            base: 2,
            max: Some(Duration::from_secs(10)),
        };
        assert_eq!(backoff.delay(5), Duration::from_secs(10));
    }

    #[test]
    fn test_constant_delay() {
        let backoff = Backoff::constant(Duration::from_secs(60));
        assert_eq!(backoff.delay(0), Duration::from_secs(60));
        assert_eq!(backoff.delay(4), Duration::from_secs(60));
    }

    #[test]
    fn test_rate_limited_allows_ten_attempts() {
        let policy = RetryPolicy::front_default();
        let mut tracker = policy.tracker();

        let mut retries = 0;
        while tracker.next_delay(&rate_limited()).is_some() {
            retries += 1;
        }
        // 9 retries after the first try = 10 attempts
        assert_eq!(retries, 9);
    }

    #[test]
    fn test_metrics_throttled_uses_fixed_interval() {
        let policy = RetryPolicy::front_default();
        let mut tracker = policy.tracker();

        let mut delays = Vec::new();
        while let Some((name, _, delay)) = tracker.next_delay(&throttled()) {
            assert_eq!(name, "metrics_throttled");
            delays.push(delay);
        }
        assert_eq!(delays, vec![Duration::from_secs(60); 4]);
    }

    #[test]
    fn test_counters_are_per_rule() {
        let policy = RetryPolicy::new()
            .with_rule(RetryRule::rate_limited(
                Backoff::constant(Duration::ZERO),
                2,
            ))
            .with_rule(RetryRule::metrics_throttled(
                Backoff::constant(Duration::ZERO),
                2,
            ));
        let mut tracker = policy.tracker();

        assert!(tracker.next_delay(&rate_limited()).is_some());
        assert!(tracker.next_delay(&throttled()).is_some());
        assert!(tracker.next_delay(&rate_limited()).is_none());
        assert!(tracker.next_delay(&throttled()).is_none());
    }

    #[test]
    fn test_other_errors_propagate() {
        let policy = RetryPolicy::front_default();
        let mut tracker = policy.tracker();

        assert!(tracker.next_delay(&Error::http_status(500, "")).is_none());
        assert!(tracker.next_delay(&Error::transport("timeout")).is_none());
        assert!(RetryPolicy::new().tracker().next_delay(&rate_limited()).is_none());
    }
}
