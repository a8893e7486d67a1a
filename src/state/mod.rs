//! State management module
//!
//! Holds the per-stream bookmarks that make syncs resumable.
//!
//! # Overview
//!
//! - `State` - bookmarks keyed by stream plus `currently_syncing`
//! - `StateManager` - shared handle with optional file persistence

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{Bookmark, State};
