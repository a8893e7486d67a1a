//! Positional tables
//!
//! Cell 0 of every row is the grouping dimension; the remaining cells are
//! metric pairs in a fixed order per stream.

use crate::cursor::SyncWindow;
use crate::error::{Error, Result};
use crate::report::{RawCell, RawReportRow};
use crate::types::{JsonValue, Record};

/// Column layout of one positional stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionalLayout {
    /// Stream id (also the analytics metric id)
    pub stream: &'static str,
    /// Name of the grouping dimension in cell 0
    pub dimension: &'static str,
    /// Metric names for cells 1..
    pub metrics: &'static [&'static str],
}

pub const TEAM_TABLE: PositionalLayout = PositionalLayout {
    stream: "team_table",
    dimension: "teammate",
    metrics: &[
        "num_conversations",
        "avg_message_conversations",
        "avg_reaction_time",
        "avg_first_reaction_time",
        "num_messages",
        "num_sent",
        "num_replied",
        "num_composed",
    ],
};

pub const TAG_TABLE: PositionalLayout = PositionalLayout {
    stream: "tag_table",
    dimension: "tag",
    metrics: &[
        "num_conversations",
        "num_messages_received",
        "num_messages_sent",
        "avg_reaction_time",
        "avg_first_reaction_time",
        "avg_resolution_time",
    ],
};

pub const CUSTOMER_TABLE: PositionalLayout = PositionalLayout {
    stream: "customer_table",
    dimension: "customer",
    metrics: &[
        "num_conversations",
        "num_messages_received",
        "num_messages_sent",
        "avg_reaction_time",
    ],
};

pub const FIRST_RESPONSE_HISTO: PositionalLayout = PositionalLayout {
    stream: "first_response_histo",
    dimension: "bucket",
    metrics: &["num_conversations"],
};

pub const RESOLUTION_HISTO: PositionalLayout = PositionalLayout {
    stream: "resolution_histo",
    dimension: "bucket",
    metrics: &["num_conversations"],
};

/// Every positional layout
pub const POSITIONAL_LAYOUTS: [&PositionalLayout; 5] = [
    &TEAM_TABLE,
    &TAG_TABLE,
    &CUSTOMER_TABLE,
    &FIRST_RESPONSE_HISTO,
    &RESOLUTION_HISTO,
];

impl PositionalLayout {
    /// Look up a layout by stream id
    pub fn find(stream: &str) -> Option<&'static PositionalLayout> {
        POSITIONAL_LAYOUTS.into_iter().find(|l| l.stream == stream)
    }

    /// Key field built from the dimension
    pub fn key_field(&self) -> String {
        format!("{}_v", self.dimension)
    }

    /// Cells a row must have
    pub fn width(&self) -> usize {
        self.metrics.len() + 1
    }
}

/// Insert `analytics_date` and `analytics_range`
pub(crate) fn base_record(window: &SyncWindow) -> Record {
    let mut record = Record::new();
    record.insert(
        "analytics_date".to_string(),
        JsonValue::String(window.analytics_date()),
    );
    record.insert(
        "analytics_range".to_string(),
        JsonValue::String(window.range.as_str().to_string()),
    );
    record
}

/// Normalize every row with `layout`
pub fn normalize_positional(
    layout: &PositionalLayout,
    rows: &[RawReportRow],
    window: &SyncWindow,
) -> Result<Vec<Record>> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| normalize_row(layout, idx, row, window))
        .collect()
}

fn normalize_row(
    layout: &PositionalLayout,
    row_idx: usize,
    row: &RawReportRow,
    window: &SyncWindow,
) -> Result<Record> {
    let mut record = base_record(window);

    let dim = cell_at(layout, row, row_idx, 0)?;
    let dim_value = value_of(layout, dim, row_idx, 0)?;
    let name = layout.dimension;

    record.insert(format!("{name}_v"), dim_value.clone());
    record.insert(
        format!("{name}_url"),
        dim.url().cloned().unwrap_or_else(|| JsonValue::from("")),
    );
    record.insert(format!("{name}_id"), dimension_id(layout, dim, row_idx)?);

    for (offset, metric) in layout.metrics.iter().enumerate() {
        let idx = offset + 1;
        let cell = cell_at(layout, row, row_idx, idx)?;
        let value = value_of(layout, cell, row_idx, idx)?;
        let previous = cell.previous_value().unwrap_or(value);

        record.insert(format!("{metric}_v"), value.clone());
        record.insert(format!("{metric}_p"), previous.clone());
    }

    Ok(record)
}

/// Integer id of the dimension cell; `0` when absent, numeric strings coerced
fn dimension_id(layout: &PositionalLayout, cell: &RawCell, row_idx: usize) -> Result<JsonValue> {
    let id = match cell.id() {
        None => return Ok(JsonValue::from(0)),
        Some(JsonValue::Null) => return Ok(JsonValue::Null),
        Some(id) => id,
    };

    let parsed = match id {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.map(JsonValue::from).ok_or_else(|| {
        Error::malformed_row(
            layout.stream,
            format!("row {row_idx} has non-integer id {id}"),
        )
    })
}

fn cell_at<'a>(
    layout: &PositionalLayout,
    row: &'a RawReportRow,
    row_idx: usize,
    idx: usize,
) -> Result<&'a RawCell> {
    row.get(idx).ok_or_else(|| {
        Error::malformed_row(
            layout.stream,
            format!(
                "row {row_idx} has {} cells, expected {}",
                row.len(),
                layout.width()
            ),
        )
    })
}

fn value_of<'a>(
    layout: &PositionalLayout,
    cell: &'a RawCell,
    row_idx: usize,
    idx: usize,
) -> Result<&'a JsonValue> {
    cell.value().ok_or_else(|| {
        Error::malformed_row(
            layout.stream,
            format!("row {row_idx} cell {idx} has no value"),
        )
    })
}
