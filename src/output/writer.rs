//! Parquet output
//!
//! `ParquetSink` writes every record batch as its own part file under
//! `<dir>/<stream>/` before `emit` returns, so a window's rows are on disk
//! before its bookmark is saved. Existing parts are never overwritten: a
//! resumed run adds files next to the earlier ones. Schema and state messages
//! are passed through to a JSON sink so the state can still be captured from
//! stdout.

use super::schema::records_to_batch;
use super::sink::RecordSink;
use crate::engine::Message;
use crate::error::{Error, Result};
use crate::schema::StreamDefinition;
use crate::types::Record;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Write a single RecordBatch to a Parquet file and sync it to disk,
/// returning the row count
pub fn write_batch_to_parquet(
    path: impl AsRef<Path>,
    batch: &RecordBatch,
    config: &ParquetWriterConfig,
) -> Result<usize> {
    let file = File::create(path.as_ref()).map_err(|e| {
        Error::output(format!(
            "Failed to create {}: {e}",
            path.as_ref().display()
        ))
    })?;

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(config.build_properties()))
        .map_err(|e| Error::output(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(batch)
        .map_err(|e| Error::output(format!("Failed to write batch: {e}")))?;
    let file = writer
        .into_inner()
        .map_err(|e| Error::output(format!("Failed to close Parquet writer: {e}")))?;
    file.sync_all().map_err(|e| {
        Error::output(format!("Failed to sync {}: {e}", path.as_ref().display()))
    })?;

    Ok(batch.num_rows())
}

/// Writes one Parquet part file per record batch
pub struct ParquetSink {
    dir: PathBuf,
    config: ParquetWriterConfig,
    written: Vec<PathBuf>,
    passthrough: Box<dyn RecordSink>,
}

impl ParquetSink {
    /// Write files under `dir`; non-record messages go to `passthrough`
    pub fn new(dir: impl Into<PathBuf>, passthrough: Box<dyn RecordSink>) -> Self {
        Self {
            dir: dir.into(),
            config: ParquetWriterConfig::default(),
            written: Vec::new(),
            passthrough,
        }
    }

    /// Directory holding the part files of `stream`
    pub fn stream_dir(&self, stream: &str) -> PathBuf {
        self.dir.join(stream)
    }

    /// Part files written by this sink, in order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Write `records` to a new part file.
    ///
    /// The batch goes to a hidden temp file first and is then linked under a
    /// free part name, so a crash never leaves a truncated part and an existing
    /// part is never replaced.
    fn write_part(
        &self,
        stream: &str,
        records: &[Record],
        extracted: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let def = StreamDefinition::find(stream).ok_or_else(|| Error::StreamNotFound {
            stream: stream.to_string(),
        })?;
        let batch = records_to_batch(def, records)?;

        let dir = self.stream_dir(stream);
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::output(format!("Failed to create {}: {e}", dir.display())))?;

        let stem = format!("part-{}", extracted.format("%Y%m%dT%H%M%S%6fZ"));
        let tmp = dir.join(format!(".{stem}.tmp"));
        write_batch_to_parquet(&tmp, &batch, &self.config)?;

        let linked = link_free_name(&tmp, &dir, &stem);
        let removed = std::fs::remove_file(&tmp);
        let path = linked?;
        removed.map_err(|e| Error::output(format!("Failed to remove {}: {e}", tmp.display())))?;

        debug!("Wrote {} rows to {}", batch.num_rows(), path.display());
        Ok(path)
    }
}

/// Hard-link `tmp` to the first `<stem>-NNNN.parquet` that does not exist yet
fn link_free_name(tmp: &Path, dir: &Path, stem: &str) -> Result<PathBuf> {
    for seq in 0u32.. {
        let path = dir.join(format!("{stem}-{seq:04}.parquet"));
        match std::fs::hard_link(tmp, &path) {
            Ok(()) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(Error::output(format!(
                    "Failed to create {}: {e}",
                    path.display()
                )))
            }
        }
    }
    Err(Error::output(format!(
        "No free part name for {stem} in {}",
        dir.display()
    )))
}

impl RecordSink for ParquetSink {
    fn emit(&mut self, message: &Message) -> Result<()> {
        match message {
            Message::Record {
                stream,
                records,
                time_extracted,
            } => {
                let path = self.write_part(stream, records, *time_extracted)?;
                self.written.push(path);
                Ok(())
            }
            _ => self.passthrough.emit(message),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if !self.written.is_empty() {
            info!(
                "Wrote {} Parquet files under {}",
                self.written.len(),
                self.dir.display()
            );
        }
        self.passthrough.finish()
    }
}

impl std::fmt::Debug for ParquetSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetSink")
            .field("dir", &self.dir)
            .field("config", &self.config)
            .field("written", &self.written.len())
            .finish_non_exhaustive()
    }
}
