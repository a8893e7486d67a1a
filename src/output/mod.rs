//! Output module
//!
//! Sinks that receive engine messages.
//!
//! # Overview
//!
//! - `JsonLinesSink` - Singer-style JSON lines on any writer
//! - `ParquetSink` - one Parquet part file per record batch, typed from the stream fields
//! - `MemorySink` - keeps messages in memory

mod schema;
mod sink;
mod writer;

pub use schema::{arrow_schema, arrow_type, records_to_batch};
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
pub use writer::{write_batch_to_parquet, ParquetSink, ParquetWriterConfig};
