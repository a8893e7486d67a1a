//! Window slicing and bookmark handling

use crate::config::TapConfig;
use crate::error::{Error, Result};
use crate::state::StateManager;
use crate::types::IncrementalRange;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

/// Format of `date_to_resume` in the persisted state
pub const BOOKMARK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// SyncWindow
// ============================================================================

/// Half-open interval `[start, end)` of one sync iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncWindow {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
    /// Granularity the window was cut with
    pub range: IncrementalRange,
}

impl SyncWindow {
    /// Window of one step starting at `start`
    pub fn new(start: DateTime<Utc>, range: IncrementalRange) -> Self {
        Self {
            start,
            end: start + range.step(),
            range,
        }
    }

    /// Start as epoch seconds
    pub fn start_epoch(&self) -> i64 {
        self.start.timestamp()
    }

    /// End as epoch seconds
    pub fn end_epoch(&self) -> i64 {
        self.end.timestamp()
    }

    /// Value injected as `analytics_date`
    pub fn analytics_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}) {}",
            self.start.format(BOOKMARK_FORMAT),
            self.end.format(BOOKMARK_FORMAT),
            self.range
        )
    }
}

// ============================================================================
// Window Sequence
// ============================================================================

/// Lazy sequence of consecutive windows; yields while `current <= end`
#[derive(Debug, Clone)]
pub struct Windows {
    current: DateTime<Utc>,
    end: DateTime<Utc>,
    range: IncrementalRange,
}

impl Windows {
    /// Windows from `current` through `end` (inclusive start bound)
    pub fn new(current: DateTime<Utc>, end: DateTime<Utc>, range: IncrementalRange) -> Self {
        Self {
            current,
            end,
            range,
        }
    }
}

impl Iterator for Windows {
    type Item = SyncWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current > self.end {
            return None;
        }

        let window = SyncWindow::new(self.current, self.range);
        self.current = window.end;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.current > self.end {
            return (0, Some(0));
        }
        let step = self.range.step().num_seconds();
        let span = (self.end - self.current).num_seconds();
        let n = (span / step + 1) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Windows {}

// ============================================================================
// IncrementalCursor
// ============================================================================

/// Resolves the sync range and persists progress per stream
#[derive(Debug, Clone)]
pub struct IncrementalCursor {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    range: IncrementalRange,
    state: StateManager,
}

impl IncrementalCursor {
    /// Resolve start/end from the config relative to `now`
    pub fn new(config: &TapConfig, state: StateManager, now: DateTime<Utc>) -> Result<Self> {
        let range = config.incremental_range;
        let start = resolve_start(config.start_date()?, range, now);
        let end = resolve_end(config.end_date()?, range, now);

        debug!(
            "Sync range {} .. {} ({})",
            start.format(BOOKMARK_FORMAT),
            end.format(BOOKMARK_FORMAT),
            range
        );

        Ok(Self::from_bounds(start, end, range, state))
    }

    /// Cursor over explicit bounds
    pub fn from_bounds(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        range: IncrementalRange,
        state: StateManager,
    ) -> Self {
        Self {
            start,
            end,
            range,
            state,
        }
    }

    /// Resolved start
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Resolved end
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Window granularity
    pub fn range(&self) -> IncrementalRange {
        self.range
    }

    /// Where `stream` picks up: its bookmark, else the resolved start
    pub async fn resume_point(&self, stream: &str) -> Result<DateTime<Utc>> {
        match self.state.get_bookmark(stream).await {
            Some(bookmark) => parse_datetime(&bookmark).map_err(|_| {
                Error::state(format!(
                    "Invalid date_to_resume for stream '{stream}': {bookmark}"
                ))
            }),
            None => Ok(self.start),
        }
    }

    /// Window sequence for `stream`; re-reads the bookmark on every call
    pub async fn windows_for(&self, stream: &str) -> Result<Windows> {
        let current = self.resume_point(stream).await?;
        Ok(Windows::new(current, self.end, self.range))
    }

    /// Persist `date_to_resume = window_end` for `stream`
    pub async fn checkpoint(&self, stream: &str, window_end: DateTime<Utc>) -> Result<()> {
        let bookmark = format_bookmark(window_end);
        debug!("Checkpoint {stream}: date_to_resume = {bookmark}");
        self.state.set_bookmark(stream, bookmark).await
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Truncate to midnight (daily) or the top of the hour (hourly)
pub fn truncate(dt: DateTime<Utc>, range: IncrementalRange) -> DateTime<Utc> {
    let step = range.step().num_seconds();
    let ts = dt.timestamp();
    DateTime::from_timestamp(ts - ts.rem_euclid(step), 0).unwrap_or(dt)
}

/// Configured start, else the previous midnight / previous hour relative to `now`
pub fn resolve_start(
    configured: Option<DateTime<Utc>>,
    range: IncrementalRange,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    configured.unwrap_or_else(|| truncate(now, range) - range.step())
}

/// Configured end, else `now` truncated
pub fn resolve_end(
    configured: Option<DateTime<Utc>>,
    range: IncrementalRange,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    configured.unwrap_or_else(|| truncate(now, range))
}

/// Render a bookmark value
pub fn format_bookmark(dt: DateTime<Utc>) -> String {
    dt.format(BOOKMARK_FORMAT).to_string()
}

/// Parse a datetime string into UTC DateTime
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    // Try RFC 3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%Y/%m/%d",
    ];

    for fmt in formats {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ndt.and_utc());
        }
        if let Some(ndt) = NaiveDate::parse_from_str(s, fmt)
            .ok()
            .and_then(|nd| nd.and_hms_opt(0, 0, 0))
        {
            return Ok(ndt.and_utc());
        }
    }

    Err(Error::config(format!("Invalid datetime format: {s}")))
}
