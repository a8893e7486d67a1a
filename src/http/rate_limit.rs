//! Rate limiting
//!
//! Two independent mechanisms:
//! - [`RateBudget`] mirrors the server-reported budget from the
//!   `X-Ratelimit-Remaining` / `X-Ratelimit-Reset` headers.
//! - [`CallPacer`] is a client-side floor (governor token bucket) that allows
//!   one call per period regardless of what the server says.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use reqwest::header::HeaderMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Header carrying the number of calls left in the current window
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Header carrying the epoch second at which the window resets
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Longest pre-emptive wait; beyond this the call is attempted anyway
pub const MAX_BUDGET_WAIT_SECS: i64 = 300;

// ============================================================================
// Server Budget
// ============================================================================

/// Last rate-limit budget reported by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateBudget {
    /// Calls left before the reset
    pub calls_remaining: Option<u64>,
    /// Epoch second of the reset
    pub reset_epoch: Option<i64>,
}

impl RateBudget {
    /// Create an empty budget (nothing known yet)
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from response headers. Missing or unparseable headers keep the
    /// previous values.
    pub fn update_from_headers(&mut self, headers: &HeaderMap) {
        if let Some(remaining) = header_str(headers, REMAINING_HEADER)
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            self.calls_remaining = Some(remaining);
        }

        // Reset is sometimes sent with a fractional part
        if let Some(reset) = header_str(headers, RESET_HEADER)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite())
        {
            self.reset_epoch = Some(reset.floor() as i64);
        }
    }

    /// How long to block before the next call, given the current epoch second.
    ///
    /// Only waits when the budget is exhausted and the reset is at most
    /// [`MAX_BUDGET_WAIT_SECS`] away.
    pub fn wait_duration(&self, now_epoch: i64) -> Option<Duration> {
        if self.calls_remaining != Some(0) {
            return None;
        }

        let wait = self.reset_epoch? - now_epoch;
        if wait > 0 && wait <= MAX_BUDGET_WAIT_SECS {
            Some(Duration::from_secs(wait as u64))
        } else {
            None
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ============================================================================
// Client-side Pacer
// ============================================================================

/// Allows one call per period
#[derive(Clone)]
pub struct CallPacer {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    period: Duration,
}

impl CallPacer {
    /// Create a pacer allowing a single call per `period`
    pub fn new(period: Duration) -> Self {
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(Governor::direct(quota)),
            period,
        }
    }

    /// Wait until the next call is allowed
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to take the slot without waiting
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Configured period
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl std::fmt::Debug for CallPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallPacer")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}
