//! Tap configuration
//!
//! The configuration is read once per invocation from a JSON (or YAML) file
//! or an inline JSON string. Only `token` is required; everything else has
//! defaults matching the Front API limits.

use crate::cursor::parse_datetime;
use crate::error::{Error, Result};
use crate::types::{IncrementalRange, OptionStringExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api2.frontapp.com";

// ============================================================================
// Tap Config
// ============================================================================

/// Configuration recognized by the tap
#[derive(Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Bearer token for the Front API
    #[serde(default)]
    pub token: String,

    /// First day (or hour) to sync
    #[serde(default)]
    pub start_date: Option<String>,

    /// Last day (or hour) to sync
    #[serde(default)]
    pub end_date: Option<String>,

    /// Window granularity
    #[serde(default)]
    pub incremental_range: IncrementalRange,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Socket-level timeout for a single request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Client-side pacing: minimum seconds between calls (0 disables)
    #[serde(default = "default_min_call_interval")]
    pub min_call_interval_secs: u64,

    /// Sleep between polls of a report that is not ready yet
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up on a report after this many seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Delay before the second analytics request
    #[serde(default = "default_report_delay")]
    pub report_delay_secs: u64,

    /// Custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_min_call_interval() -> u64 {
    61
}

fn default_poll_interval() -> u64 {
    3
}

fn default_poll_timeout() -> u64 {
    1800
}

fn default_report_delay() -> u64 {
    2
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            start_date: None,
            end_date: None,
            incremental_range: IncrementalRange::default(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            min_call_interval_secs: default_min_call_interval(),
            poll_interval_secs: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
            report_delay_secs: default_report_delay(),
            user_agent: None,
        }
    }
}

impl std::fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapConfig")
            .field("token", &"***")
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .field("incremental_range", &self.incremental_range)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("min_call_interval_secs", &self.min_call_interval_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("report_delay_secs", &self.report_delay_secs)
            .finish_non_exhaustive()
    }
}

impl TapConfig {
    /// Create a config with just a token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Load and validate a config file (`.yaml`/`.yml` as YAML, anything else as JSON)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {e}")))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let config: Self = if is_yaml {
            serde_yaml::from_str(&contents)?
        } else {
            serde_json::from_str(&contents)
                .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate an inline JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and value ranges
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::missing_field("token"));
        }

        url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;

        let start = self.start_date()?;
        let end = self.end_date()?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(Error::invalid_value(
                    "start_date",
                    format!("start_date {start} is after end_date {end}"),
                ));
            }
        }

        if self.poll_timeout_secs == 0 {
            return Err(Error::invalid_value(
                "poll_timeout_secs",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Parsed `start_date`, if configured
    pub fn start_date(&self) -> Result<Option<DateTime<Utc>>> {
        parse_optional("start_date", self.start_date.clone())
    }

    /// Parsed `end_date`, if configured
    pub fn end_date(&self) -> Result<Option<DateTime<Utc>>> {
        parse_optional("end_date", self.end_date.clone())
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pacing interval, `None` when disabled
    pub fn min_call_interval(&self) -> Option<Duration> {
        (self.min_call_interval_secs > 0).then(|| Duration::from_secs(self.min_call_interval_secs))
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Poll timeout as a duration
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    /// Report delay as a duration
    pub fn report_delay(&self) -> Duration {
        Duration::from_secs(self.report_delay_secs)
    }
}

fn parse_optional(field: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value
        .none_if_empty()
        .map(|v| parse_datetime(&v).map_err(|e| Error::invalid_value(field, e.to_string())))
        .transpose()
}
