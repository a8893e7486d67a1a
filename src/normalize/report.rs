//! Entity report records

use super::positional::base_record;
use crate::cursor::SyncWindow;
use crate::report::{Entity, ReportHandle, ReportMetric, REPORT_METRICS};
use crate::types::{JsonValue, Record};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-]").expect("valid regex"));

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]").expect("valid regex"));

/// Lowercase, whitespace and dashes to `_`, anything else non-alphanumeric dropped
pub fn normalize_fieldname(name: &str) -> String {
    let lower = name.to_lowercase();
    let underscored = SEPARATORS.replace_all(&lower, "_");
    INVALID_CHARS.replace_all(&underscored, "").into_owned()
}

/// Identity fields of every report record, in order
pub const REPORT_ID_FIELDS: [&str; 5] = [
    "report_id",
    "analytics_date",
    "analytics_range",
    "metric_id",
    "metric_description",
];

/// One record per (window, entity) report.
///
/// Every known metric is present; those missing from the response are
/// `null`, unknown ones are dropped.
pub fn normalize_report(
    stream: &str,
    window: &SyncWindow,
    entity: &Entity,
    handle: &ReportHandle,
    metrics: &[ReportMetric],
) -> Record {
    let mut record = base_record(window);
    record.insert(
        "report_id".to_string(),
        JsonValue::from(handle.report_id()),
    );
    record.insert("metric_id".to_string(), JsonValue::from(entity.id.as_str()));
    record.insert(
        "metric_description".to_string(),
        entity
            .description
            .as_deref()
            .map_or(JsonValue::Null, JsonValue::from),
    );

    for name in REPORT_METRICS {
        record.insert(normalize_fieldname(name), JsonValue::Null);
    }

    for metric in metrics {
        let field = normalize_fieldname(&metric.id);
        match record.get_mut(&field) {
            Some(slot) if !REPORT_ID_FIELDS.contains(&field.as_str()) => {
                *slot = metric.value.clone();
            }
            _ => debug!("{stream}: dropping unknown metric '{}'", metric.id),
        }
    }

    record
}
