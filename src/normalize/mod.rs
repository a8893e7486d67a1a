//! Record normalization
//!
//! Turns raw analytics responses into flat records with a constant field set
//! per stream. Everything here is pure; the only failure is a row that does
//! not match its stream's layout (`MalformedRow`).
//!
//! Positional streams are dispatched through a table of normalization
//! functions keyed by stream id.

mod positional;
mod report;

pub use positional::{
    normalize_positional, PositionalLayout, CUSTOMER_TABLE, FIRST_RESPONSE_HISTO,
    POSITIONAL_LAYOUTS, RESOLUTION_HISTO, TAG_TABLE, TEAM_TABLE,
};
pub use report::{normalize_fieldname, normalize_report, REPORT_ID_FIELDS};

use crate::cursor::SyncWindow;
use crate::error::{Error, Result};
use crate::report::RawReportRow;
use crate::types::Record;

/// Signature shared by all positional normalizers
pub type NormalizeFn = fn(&[RawReportRow], &SyncWindow) -> Result<Vec<Record>>;

fn team_table(rows: &[RawReportRow], window: &SyncWindow) -> Result<Vec<Record>> {
    normalize_positional(&TEAM_TABLE, rows, window)
}

fn tag_table(rows: &[RawReportRow], window: &SyncWindow) -> Result<Vec<Record>> {
    normalize_positional(&TAG_TABLE, rows, window)
}

fn customer_table(rows: &[RawReportRow], window: &SyncWindow) -> Result<Vec<Record>> {
    normalize_positional(&CUSTOMER_TABLE, rows, window)
}

fn first_response_histo(rows: &[RawReportRow], window: &SyncWindow) -> Result<Vec<Record>> {
    normalize_positional(&FIRST_RESPONSE_HISTO, rows, window)
}

fn resolution_histo(rows: &[RawReportRow], window: &SyncWindow) -> Result<Vec<Record>> {
    normalize_positional(&RESOLUTION_HISTO, rows, window)
}

static NORMALIZERS: [(&str, NormalizeFn); 5] = [
    ("team_table", team_table),
    ("tag_table", tag_table),
    ("customer_table", customer_table),
    ("first_response_histo", first_response_histo),
    ("resolution_histo", resolution_histo),
];

/// Normalization function for a positional stream
pub fn normalizer_for(stream: &str) -> Option<NormalizeFn> {
    NORMALIZERS
        .iter()
        .find(|(id, _)| *id == stream)
        .map(|(_, f)| *f)
}

/// Normalize the rows of `stream` for `window`
pub fn normalize_rows(
    stream: &str,
    rows: &[RawReportRow],
    window: &SyncWindow,
) -> Result<Vec<Record>> {
    let normalize = normalizer_for(stream).ok_or_else(|| Error::StreamNotFound {
        stream: stream.to_string(),
    })?;
    normalize(rows, window)
}

#[cfg(test)]
mod tests;
