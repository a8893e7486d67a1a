//! Sync orchestration
//!
//! Walks every selected stream window by window: fetch, normalize, emit one
//! record batch, checkpoint, emit state.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Drives cursor, poller and normalizers for each stream
//! - `SyncConfig` - Configuration for sync operations
//! - `Message` - Schema, record and state messages handed to a sink
//!
//! A stream error aborts that stream only; windows checkpointed before the
//! failure stay committed and the next run resumes after them.

mod types;

pub use types::{Message, SyncConfig, SyncStats};

use crate::context::TapContext;
use crate::cursor::{IncrementalCursor, SyncWindow};
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::normalize::{normalize_report, normalize_rows};
use crate::output::RecordSink;
use crate::report::{Entity, ReportPoller};
use crate::schema::{EntitySource, StreamDefinition, StreamKind};
use crate::state::StateManager;
use crate::types::Record;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// Window source and bookmark writer
    cursor: IncrementalCursor,
    /// Report fetcher
    poller: ReportPoller,
    /// State manager
    state: StateManager,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(cursor: IncrementalCursor, poller: ReportPoller, state: StateManager) -> Self {
        Self {
            cursor,
            poller,
            state,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
        }
    }

    /// Build the engine for a run
    pub fn from_context(ctx: &TapContext, transport: Arc<dyn Transport>) -> Result<Self> {
        let poller = ReportPoller::new(transport, ctx.poll_config());
        Ok(Self::new(ctx.cursor()?, poller, ctx.state.clone()))
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Sync `stream_ids` in order, resuming an interrupted stream first.
    ///
    /// Clears `currently_syncing` and emits a final state once every stream
    /// has been attempted.
    pub async fn run<S: AsRef<str>>(
        &mut self,
        stream_ids: &[S],
        sink: &mut dyn RecordSink,
    ) -> Result<SyncStats> {
        let start = Instant::now();
        let streams = self.sync_order(stream_ids).await?;

        info!(
            "Selected streams: {}",
            streams.iter().map(|s| s.id).collect::<Vec<_>>().join(", ")
        );

        for stream in streams {
            match self.sync_stream(stream, sink).await {
                Ok(()) => self.stats.add_stream(),
                Err(e) => {
                    self.stats.add_error();
                    error!("Stream {} failed: {e}", stream.id);
                    if self.config.fail_fast {
                        self.finish_stats(start);
                        return Err(e);
                    }
                }
            }
        }

        self.state.set_currently_syncing(None).await?;
        self.emit_state(sink).await?;
        self.finish_stats(start);

        info!(
            "Sync complete: {} records, {} windows, {} streams, {} errors",
            self.stats.records_synced,
            self.stats.windows_synced,
            self.stats.streams_synced,
            self.stats.errors
        );

        Ok(self.stats.clone())
    }

    /// Sync one stream from its bookmark to the end of the range
    pub async fn sync_stream(
        &mut self,
        stream: &StreamDefinition,
        sink: &mut dyn RecordSink,
    ) -> Result<()> {
        sink.emit(&Message::schema(stream))?;
        self.state.set_currently_syncing(Some(stream.id)).await?;
        self.emit_state(sink).await?;

        let windows = self.cursor.windows_for(stream.id).await?;
        if windows.len() == 0 {
            info!("{}: up to date", stream.id);
            return Ok(());
        }
        info!("{}: syncing {} windows", stream.id, windows.len());

        let entities = match stream.kind {
            StreamKind::EntityReport(source) => {
                self.poller
                    .list_entities(source.path, source.description_key)
                    .await?
            }
            StreamKind::Positional(_) => Vec::new(),
        };

        for window in windows {
            let records = match stream.kind {
                StreamKind::Positional(_) => {
                    let rows = self.poller.fetch_metric_rows(stream.id, &window).await?;
                    normalize_rows(stream.id, &rows, &window)?
                }
                StreamKind::EntityReport(source) => {
                    self.fetch_reports(stream.id, source, &entities, &window)
                        .await?
                }
            };

            // The sink has the batch before the bookmark moves
            let count = records.len();
            if count > 0 {
                sink.emit(&Message::records(stream.id, records, Utc::now()))?;
            }

            self.cursor.checkpoint(stream.id, window.end).await?;
            self.emit_state(sink).await?;

            self.stats.add_records(count);
            self.stats.add_window();
            info!("{}: {count} records for {window}", stream.id);
        }

        Ok(())
    }

    /// One record per entity whose report could be generated
    async fn fetch_reports(
        &mut self,
        stream: &str,
        source: EntitySource,
        entities: &[Entity],
        window: &SyncWindow,
    ) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(entities.len());

        for entity in entities {
            let Some(handle) = self.poller.submit(window, source.filter, &entity.id).await? else {
                self.stats.add_skipped_report();
                continue;
            };

            info!(
                "Metrics query {stream} {window}: {} ({})",
                entity.id,
                entity.description.as_deref().unwrap_or("")
            );
            let metrics = self.poller.await_report(stream, &handle).await?;
            records.push(normalize_report(stream, window, entity, &handle, &metrics));
        }

        Ok(records)
    }

    /// Resolve ids and move an interrupted stream to the front
    async fn sync_order<S: AsRef<str>>(
        &self,
        stream_ids: &[S],
    ) -> Result<Vec<&'static StreamDefinition>> {
        let mut streams = stream_ids
            .iter()
            .map(|id| {
                StreamDefinition::find(id.as_ref()).ok_or_else(|| Error::StreamNotFound {
                    stream: id.as_ref().to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(last) = self.state.currently_syncing().await {
            match streams.iter().position(|s| s.id == last) {
                Some(idx) => {
                    info!("Resuming interrupted stream {last}");
                    streams[..=idx].rotate_right(1);
                }
                None => warn!("Previously syncing stream {last} is not selected"),
            }
        }

        Ok(streams)
    }

    async fn emit_state(&self, sink: &mut dyn RecordSink) -> Result<()> {
        sink.emit(&Message::state(self.state.snapshot().await))
    }

    fn finish_stats(&mut self, start: Instant) {
        self.stats.set_duration(start.elapsed().as_millis() as u64);
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("cursor", &self.cursor)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
