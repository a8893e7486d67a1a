//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs:
//!
//! ```json
//! {"bookmarks": {"team_table": {"date_to_resume": "2024-01-03 00:00:00"}},
//!  "currently_syncing": null}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete state for the tap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream bookmarks
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,

    /// Stream being synced when the state was written
    #[serde(default)]
    pub currently_syncing: Option<String>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bookmark for a stream
    pub fn get_bookmark(&self, stream: &str) -> Option<&Bookmark> {
        self.bookmarks.get(stream)
    }

    /// Resume point for a stream, if any
    pub fn date_to_resume(&self, stream: &str) -> Option<&str> {
        self.bookmarks
            .get(stream)
            .map(|b| b.date_to_resume.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Overwrite the resume point for a stream
    pub fn set_bookmark(&mut self, stream: &str, date_to_resume: String) {
        self.bookmarks
            .insert(stream.to_string(), Bookmark { date_to_resume });
    }
}

/// Bookmark for a single stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Start of the next window to sync (`YYYY-MM-DD HH:MM:SS`, UTC)
    #[serde(default)]
    pub date_to_resume: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default() {
        let state = State::new();
        assert!(state.bookmarks.is_empty());
        assert!(state.currently_syncing.is_none());
    }

    #[test]
    fn test_state_bookmark() {
        let mut state = State::new();
        assert!(state.date_to_resume("team_table").is_none());

        state.set_bookmark("team_table", "2024-01-02 00:00:00".to_string());
        assert_eq!(
            state.date_to_resume("team_table"),
            Some("2024-01-02 00:00:00")
        );
    }

    #[test]
    fn test_empty_bookmark_is_absent() {
        let state: State =
            serde_json::from_str(r#"{"bookmarks": {"tag_table": {}}}"#).unwrap();
        assert!(state.get_bookmark("tag_table").is_some());
        assert!(state.date_to_resume("tag_table").is_none());
    }

    #[test]
    fn test_state_serialization() {
        let mut state = State::new();
        state.set_bookmark("tag_table", "2024-01-05 13:00:00".to_string());
        state.currently_syncing = Some("tag_table".to_string());

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "bookmarks": {"tag_table": {"date_to_resume": "2024-01-05 13:00:00"}},
                "currently_syncing": "tag_table"
            })
        );

        let restored: State = serde_json::from_value(json).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_state_tolerates_unknown_fields() {
        let state: State =
            serde_json::from_str(r#"{"bookmarks": {}, "version": 2}"#).unwrap();
        assert_eq!(state, State::new());
    }
}
