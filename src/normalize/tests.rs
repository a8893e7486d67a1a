//! Tests for record normalization

use super::*;
use crate::cursor::SyncWindow;
use crate::report::{Entity, RawCell, ReportHandle, ReportMetric, REPORT_METRICS};
use crate::types::IncrementalRange;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use test_case::test_case;

fn daily() -> SyncWindow {
    SyncWindow::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        IncrementalRange::Daily,
    )
}

fn row(cells: Value) -> RawReportRow {
    serde_json::from_value(cells).unwrap()
}

fn keys(record: &Record) -> BTreeSet<String> {
    record.keys().cloned().collect()
}

/// A full row for `layout` with every optional key present
fn full_row(layout: &PositionalLayout) -> RawReportRow {
    let mut cells = vec![json!({"t": "string", "v": "x", "url": "/x", "id": 1})];
    cells.extend(layout.metrics.iter().map(|_| json!({"t": "number", "v": 1, "p": 2})));
    row(Value::Array(cells))
}

/// An aggregate row: no url/id on the dimension, no previous values
fn aggregate_row(layout: &PositionalLayout) -> RawReportRow {
    let mut cells = vec![json!({"v": "All"})];
    cells.extend(layout.metrics.iter().map(|_| json!({"v": 5})));
    row(Value::Array(cells))
}

// ============================================================================
// Positional Streams
// ============================================================================

#[test]
fn test_team_table_example() {
    let rows = vec![row(json!([
        {"v": "Andrew", "url": "/t/andrew", "id": 42},
        {"v": 12, "p": 10},
        {"v": 3.5, "p": 4.0},
        {"v": 120, "p": 100},
        {"v": 60, "p": 80},
        {"v": 30, "p": 20},
        {"v": 25, "p": 15},
        {"v": 10, "p": 5},
        {"v": 2, "p": 1}
    ]))];

    let records = normalize_rows("team_table", &rows, &daily()).unwrap();
    assert_eq!(records.len(), 1);

    let expected = json!({
        "analytics_date": "2024-01-01",
        "analytics_range": "daily",
        "teammate_v": "Andrew",
        "teammate_url": "/t/andrew",
        "teammate_id": 42,
        "num_conversations_v": 12,
        "num_conversations_p": 10,
        "avg_message_conversations_v": 3.5,
        "avg_message_conversations_p": 4.0,
        "avg_reaction_time_v": 120,
        "avg_reaction_time_p": 100,
        "avg_first_reaction_time_v": 60,
        "avg_first_reaction_time_p": 80,
        "num_messages_v": 30,
        "num_messages_p": 20,
        "num_sent_v": 25,
        "num_sent_p": 15,
        "num_replied_v": 10,
        "num_replied_p": 5,
        "num_composed_v": 2,
        "num_composed_p": 1
    });
    assert_eq!(Value::Object(records[0].clone()), expected);
}

#[test]
fn test_aggregate_row_defaults() {
    let rows = vec![aggregate_row(&TAG_TABLE)];
    let record = &normalize_rows("tag_table", &rows, &daily()).unwrap()[0];

    assert_eq!(record["tag_v"], json!("All"));
    assert_eq!(record["tag_url"], json!(""));
    assert_eq!(record["tag_id"], json!(0));
    assert_eq!(record["num_messages_sent_v"], json!(5));
    assert_eq!(record["num_messages_sent_p"], json!(5));
}

#[test]
fn test_explicit_null_is_kept() {
    let rows = vec![row(json!([{"v": "b1"}, {"v": 7, "p": null}]))];
    let record = &normalize_rows("resolution_histo", &rows, &daily()).unwrap()[0];
    assert_eq!(record["num_conversations_p"], Value::Null);
}

#[test]
fn test_numeric_string_id_is_coerced() {
    let rows = vec![row(json!([{"v": "b1", "id": " 17 "}, {"v": 7}]))];
    let record = &normalize_rows("resolution_histo", &rows, &daily()).unwrap()[0];
    assert_eq!(record["bucket_id"], json!(17));
}

#[test_case(json!("tea_abc") ; "non-numeric string")]
#[test_case(json!(1.5) ; "fraction")]
#[test_case(json!({"id": 1}) ; "object")]
fn test_non_integer_id_is_malformed(id: Value) {
    let rows = vec![row(json!([{"v": "Andrew", "id": id}, {"v": 1}]))];
    let err = normalize_rows("first_response_histo", &rows, &daily()).unwrap_err();

    match err {
        crate::error::Error::MalformedRow { stream, message } => {
            assert_eq!(stream, "first_response_histo");
            assert!(message.contains("non-integer id"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_hourly_window_fields() {
    let window = SyncWindow::new(
        Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap(),
        IncrementalRange::Hourly,
    );
    let rows = vec![aggregate_row(&FIRST_RESPONSE_HISTO)];
    let record = &normalize_rows("first_response_histo", &rows, &window).unwrap()[0];

    assert_eq!(record["analytics_date"], json!("2024-02-29"));
    assert_eq!(record["analytics_range"], json!("hourly"));
}

#[test_case(&TEAM_TABLE ; "team_table")]
#[test_case(&TAG_TABLE ; "tag_table")]
#[test_case(&CUSTOMER_TABLE ; "customer_table")]
#[test_case(&FIRST_RESPONSE_HISTO ; "first_response_histo")]
#[test_case(&RESOLUTION_HISTO ; "resolution_histo")]
fn test_field_set_is_constant(layout: &PositionalLayout) {
    let rows = vec![full_row(layout), aggregate_row(layout)];
    let records = normalize_rows(layout.stream, &rows, &daily()).unwrap();

    let declared: BTreeSet<String> = crate::schema::StreamDefinition::find(layout.stream)
        .unwrap()
        .field_names()
        .into_iter()
        .collect();

    for record in &records {
        assert_eq!(keys(record), declared);
    }
}

#[test]
fn test_extra_cells_are_ignored() {
    let mut cells = full_row(&FIRST_RESPONSE_HISTO);
    cells.push(RawCell::from_value(json!({"v": 99})).unwrap());

    let record = &normalize_rows("first_response_histo", &[cells], &daily()).unwrap()[0];
    assert_eq!(record.len(), 7);
}

#[test]
fn test_short_row_is_malformed() {
    let rows = vec![row(json!([{"v": "Andrew"}, {"v": 1}]))];
    let err = normalize_rows("team_table", &rows, &daily()).unwrap_err();

    match err {
        crate::error::Error::MalformedRow { stream, message } => {
            assert_eq!(stream, "team_table");
            assert!(message.contains("expected 9"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_value_is_malformed() {
    let rows = vec![
        aggregate_row(&CUSTOMER_TABLE),
        row(json!([{"v": "c"}, {"p": 1}, {"v": 1}, {"v": 1}, {"v": 1}])),
    ];
    let err = normalize_rows("customer_table", &rows, &daily()).unwrap_err();
    assert!(err.to_string().contains("row 1 cell 1 has no value"));
}

#[test]
fn test_unknown_stream() {
    assert!(normalizer_for("tags_table").is_none());
    let err = normalize_rows("nope", &[], &daily()).unwrap_err();
    assert!(matches!(err, crate::error::Error::StreamNotFound { .. }));
}

#[test]
fn test_empty_rows() {
    assert!(normalize_rows("tag_table", &[], &daily()).unwrap().is_empty());
}

#[test]
fn test_layout_lookup() {
    let layout = PositionalLayout::find("customer_table").unwrap();
    assert_eq!(layout.key_field(), "customer_v");
    assert_eq!(layout.width(), 5);
    assert!(PositionalLayout::find("accounts_table").is_none());
}

// ============================================================================
// Entity Reports
// ============================================================================

#[test_case("Avg First Response Time", "avg_first_response_time" ; "spaces")]
#[test_case("num-messages-sent", "num_messages_sent" ; "dashes")]
#[test_case("pct_CSAT (survey)%", "pct_csat_survey" ; "symbols")]
#[test_case("already_snake", "already_snake" ; "unchanged")]
fn test_normalize_fieldname(input: &str, expected: &str) {
    assert_eq!(normalize_fieldname(input), expected);
}

#[test]
fn test_report_record() {
    let entity = Entity::new("tea_1", Some("ann@example.com".to_string()));
    let handle = ReportHandle::new("https://api2.frontapp.com/analytics/reports/rep_5");
    let metrics = vec![
        ReportMetric {
            id: "num_messages_sent".to_string(),
            metric_type: Some("number".to_string()),
            value: json!(14),
        },
        ReportMetric {
            id: "brand_new_metric".to_string(),
            metric_type: None,
            value: json!(1),
        },
        ReportMetric {
            id: "report_id".to_string(),
            metric_type: None,
            value: json!("spoofed"),
        },
    ];

    let record = normalize_report("teammates_table", &daily(), &entity, &handle, &metrics);

    assert_eq!(record["report_id"], json!("rep_5"));
    assert_eq!(record["metric_id"], json!("tea_1"));
    assert_eq!(record["metric_description"], json!("ann@example.com"));
    assert_eq!(record["analytics_date"], json!("2024-01-01"));
    assert_eq!(record["analytics_range"], json!("daily"));
    assert_eq!(record["num_messages_sent"], json!(14));
    assert_eq!(record["avg_handle_time"], Value::Null);
    assert!(!record.contains_key("brand_new_metric"));
    assert_eq!(record.len(), REPORT_ID_FIELDS.len() + REPORT_METRICS.len());
}

#[test]
fn test_report_record_matches_declared_fields() {
    let entity = Entity::new("inb_1", None);
    let handle = ReportHandle::new("rep_1");
    let record = normalize_report("inboxes_table", &daily(), &entity, &handle, &[]);

    let declared: BTreeSet<String> = crate::schema::StreamDefinition::find("inboxes_table")
        .unwrap()
        .field_names()
        .into_iter()
        .collect();

    assert_eq!(keys(&record), declared);
    assert_eq!(record["metric_description"], Value::Null);
}
