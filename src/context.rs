//! Per-invocation context
//!
//! Built once from the config and state and handed to the transport, cursor
//! and engine. "Now" is captured here so every stream of a run resolves the
//! same default range.

use crate::config::TapConfig;
use crate::cursor::IncrementalCursor;
use crate::error::Result;
use crate::http::FrontClient;
use crate::report::PollConfig;
use crate::state::StateManager;
use chrono::{DateTime, Utc};

/// Config, state handle and sync start instant
#[derive(Debug, Clone)]
pub struct TapContext {
    pub config: TapConfig,
    pub state: StateManager,
    pub started_at: DateTime<Utc>,
}

impl TapContext {
    /// Validate the config and capture the current time
    pub fn new(config: TapConfig, state: StateManager) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state,
            started_at: Utc::now(),
        })
    }

    /// Pin the sync start instant
    #[must_use]
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// HTTP client for this run
    pub fn client(&self) -> Result<FrontClient> {
        FrontClient::from_tap_config(&self.config)
    }

    /// Cursor over the configured range
    pub fn cursor(&self) -> Result<IncrementalCursor> {
        IncrementalCursor::new(&self.config, self.state.clone(), self.started_at)
    }

    /// Report polling parameters
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::from_tap_config(&self.config)
    }
}
