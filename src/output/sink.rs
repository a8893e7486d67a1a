//! Message sinks
//!
//! `JsonLinesSink` writes Singer-style messages, one JSON document per line:
//!
//! ```text
//! {"type":"SCHEMA","stream":"team_table","schema":{...},"key_properties":[...]}
//! {"type":"RECORD","stream":"team_table","record":{...},"time_extracted":"..."}
//! {"type":"STATE","value":{"bookmarks":{...},"currently_syncing":null}}
//! ```

use crate::engine::Message;
use crate::error::{Error, Result};
use crate::schema::JsonSchema;
use crate::state::State;
use crate::types::Record;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// Destination for engine messages
pub trait RecordSink: Send {
    /// Handle one message
    fn emit(&mut self, message: &Message) -> Result<()>;

    /// Flush buffered output; called once after the run
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
enum SingerMessage<'a> {
    Schema {
        stream: &'a str,
        schema: &'a JsonSchema,
        key_properties: &'a [String],
    },
    Record {
        stream: &'a str,
        record: &'a Record,
        time_extracted: &'a DateTime<Utc>,
    },
    State {
        value: &'a State,
    },
}

/// Singer lines for a message; a record batch becomes one line per record
fn singer_messages(message: &Message) -> Vec<SingerMessage<'_>> {
    match message {
        Message::Schema {
            stream,
            schema,
            key_properties,
        } => vec![SingerMessage::Schema {
            stream,
            schema,
            key_properties,
        }],
        Message::Record {
            stream,
            records,
            time_extracted,
        } => records
            .iter()
            .map(|record| SingerMessage::Record {
                stream,
                record,
                time_extracted,
            })
            .collect(),
        Message::State { value } => vec![SingerMessage::State { value }],
    }
}

/// Writes Singer JSON lines to any writer
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    pretty: bool,
    lines_written: usize,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Compact output, one message per line
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
            lines_written: 0,
        }
    }

    /// Pretty-print each message
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Messages written so far
    pub fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, message: &SingerMessage<'_>) -> Result<()> {
        let line = if self.pretty {
            serde_json::to_string_pretty(message)?
        } else {
            serde_json::to_string(message)?
        };
        writeln!(self.writer, "{line}")
            .map_err(|e| Error::output(format!("Failed to write message: {e}")))?;
        self.lines_written += 1;
        Ok(())
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn emit(&mut self, message: &Message) -> Result<()> {
        for line in singer_messages(message) {
            self.write_line(&line)?;
        }
        self.writer
            .flush()
            .map_err(|e| Error::output(format!("Failed to flush output: {e}")))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::output(format!("Failed to flush output: {e}")))
    }
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Vec<Message>,
    finished: bool,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// All records emitted for `stream`, in order
    pub fn records(&self, stream: &str) -> Vec<Record> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, records, ..
                } if s == stream => Some(records.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Number of record batches emitted for `stream`
    pub fn batch_count(&self, stream: &str) -> usize {
        self.messages
            .iter()
            .filter(|m| m.is_record() && m.stream() == Some(stream))
            .count()
    }

    /// State snapshots, in order
    pub fn states(&self) -> Vec<State> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether `finish` was called
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl RecordSink for MemorySink {
    fn emit(&mut self, message: &Message) -> Result<()> {
        self.messages.push(message.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
