//! Engine types
//!
//! Messages emitted during a sync, plus configuration and statistics.

use crate::schema::{JsonSchema, StreamDefinition};
use crate::state::State;
use crate::types::Record;
use chrono::{DateTime, Utc};

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Stream schema, emitted before its records
    Schema {
        /// Stream name
        stream: String,
        /// Record schema
        schema: JsonSchema,
        /// Primary key fields
        key_properties: Vec<String>,
    },
    /// Records of one window
    Record {
        /// Stream name
        stream: String,
        /// Normalized records
        records: Vec<Record>,
        /// When the window was fetched
        time_extracted: DateTime<Utc>,
    },
    /// Full state after a checkpoint
    State {
        /// State snapshot
        value: State,
    },
}

impl Message {
    /// Create a schema message for a stream
    pub fn schema(stream: &StreamDefinition) -> Self {
        Self::Schema {
            stream: stream.id.to_string(),
            schema: stream.json_schema(),
            key_properties: stream.key_properties.clone(),
        }
    }

    /// Create a record batch message
    pub fn records(
        stream: impl Into<String>,
        records: Vec<Record>,
        time_extracted: DateTime<Utc>,
    ) -> Self {
        Self::Record {
            stream: stream.into(),
            records,
            time_extracted,
        }
    }

    /// Create a state message
    pub fn state(value: State) -> Self {
        Self::State { value }
    }

    /// Check if this is a schema message
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Stream the message belongs to (`None` for state)
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Abort the run on the first stream error
    pub fail_fast: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { fail_fast: true }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set fail fast mode
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records emitted
    pub records_synced: usize,
    /// Windows checkpointed
    pub windows_synced: usize,
    /// Entity reports the API refused or returned without a link
    pub reports_skipped: usize,
    /// Streams completed
    pub streams_synced: usize,
    /// Streams that failed
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a window
    pub fn add_window(&mut self) {
        self.windows_synced += 1;
    }

    /// Add a skipped report
    pub fn add_skipped_report(&mut self) {
        self.reports_skipped += 1;
    }

    /// Add a stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
