//! Common types used throughout the tap
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use chrono::Duration;
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A single flat output record
pub type Record = JsonObject;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
        }
    }
}

// ============================================================================
// Incremental Range
// ============================================================================

/// Granularity of the sync windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncrementalRange {
    /// One window per calendar day
    #[default]
    Daily,
    /// One window per hour
    Hourly,
}

impl IncrementalRange {
    /// Size of one window
    pub fn step(self) -> Duration {
        match self {
            IncrementalRange::Daily => Duration::days(1),
            IncrementalRange::Hourly => Duration::hours(1),
        }
    }

    /// Value written to `analytics_range`
    pub fn as_str(self) -> &'static str {
        match self {
            IncrementalRange::Daily => "daily",
            IncrementalRange::Hourly => "hourly",
        }
    }
}

impl std::fmt::Display for IncrementalRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_conversion() {
        let get: reqwest::Method = Method::GET.into();
        assert_eq!(reqwest::Method::GET, get);
        let post: reqwest::Method = Method::POST.into();
        assert_eq!(reqwest::Method::POST, post);
    }

    #[test]
    fn test_incremental_range_serde() {
        let range: IncrementalRange = serde_json::from_str("\"hourly\"").unwrap();
        assert_eq!(range, IncrementalRange::Hourly);

        let json = serde_json::to_string(&IncrementalRange::Daily).unwrap();
        assert_eq!(json, "\"daily\"");
        assert_eq!(IncrementalRange::default(), IncrementalRange::Daily);
    }

    #[test]
    fn test_incremental_range_step() {
        assert_eq!(IncrementalRange::Daily.step(), Duration::hours(24));
        assert_eq!(IncrementalRange::Hourly.step(), Duration::minutes(60));
    }

    #[test]
    fn test_option_string_none_if_empty() {
        assert_eq!(
            Some("test".to_string()).none_if_empty(),
            Some("test".to_string())
        );
        assert_eq!(Some(String::new()).none_if_empty(), None);
        assert_eq!(Some("  ".to_string()).none_if_empty(), None);
        assert_eq!(None::<String>.none_if_empty(), None);
        assert_eq!("".to_string().none_if_empty(), None);
    }
}
