//! Incremental cursor
//!
//! Cuts the sync range into fixed-size windows (one day or one hour) and
//! persists a per-stream `date_to_resume` after each completed window.
//!
//! # Overview
//!
//! - `SyncWindow` - half-open `[start, end)` interval
//! - `Windows` - lazy, finite window sequence
//! - `IncrementalCursor` - range resolution, `windows_for` and `checkpoint`
//!
//! Resuming from a bookmark `D` yields the same windows as a fresh run
//! starting at `D` with the same end.

mod window;

pub use window::{
    format_bookmark, parse_datetime, resolve_end, resolve_start, truncate, IncrementalCursor,
    SyncWindow, Windows, BOOKMARK_FORMAT,
};
