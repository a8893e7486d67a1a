//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config → HTTP requests → records → JSON/Parquet output

use chrono::{TimeZone, Utc};
use frontapp_tap::context::TapContext;
use frontapp_tap::engine::SyncEngine;
use frontapp_tap::http::{FrontClient, Transport};
use frontapp_tap::output::{JsonLinesSink, MemorySink, ParquetSink, RecordSink};
use frontapp_tap::schema::StreamDefinition;
use frontapp_tap::state::StateManager;
use frontapp_tap::TapConfig;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn epoch(day: u32) -> String {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0)
        .unwrap()
        .timestamp()
        .to_string()
}

fn config(server: &MockServer, start: &str, end: &str) -> TapConfig {
    TapConfig::from_json(
        &json!({
            "token": "test-token",
            "start_date": start,
            "end_date": end,
            "base_url": server.uri(),
            "min_call_interval_secs": 0,
            "poll_interval_secs": 0,
            "poll_timeout_secs": 5,
            "report_delay_secs": 0
        })
        .to_string(),
    )
    .unwrap()
}

fn engine(config: TapConfig, state: StateManager) -> SyncEngine {
    let ctx = TapContext::new(config, state).unwrap();
    let client: Arc<dyn Transport> = Arc::new(ctx.client().unwrap());
    SyncEngine::from_context(&ctx, client).unwrap()
}

fn team_rows(name: &str) -> Value {
    json!({
        "metrics": [{
            "id": "team_table",
            "rows": [[
                {"t": "teammate", "v": name, "url": "/teammates/1", "id": 1},
                {"v": 12, "p": 10},
                {"v": 3.5, "p": 4.0},
                {"v": 120, "p": 100},
                {"v": 60, "p": 80},
                {"v": 30, "p": 20},
                {"v": 25, "p": 15},
                {"v": 10, "p": 5},
                {"v": 2, "p": 1}
            ]]
        }]
    })
}

async fn mount_team_day(server: &MockServer, day: u32, name: &str) {
    Mock::given(method("GET"))
        .and(path("/analytics"))
        .and(query_param("start", epoch(day).as_str()))
        .and(query_param("metrics[]", "team_table"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(team_rows(name)))
        .mount(server)
        .await;
}

fn parse_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// ============================================================================
// Positional Streams
// ============================================================================

#[tokio::test]
async fn test_team_table_to_json_lines() {
    let server = MockServer::start().await;
    mount_team_day(&server, 1, "Andrew").await;
    mount_team_day(&server, 2, "Bea").await;

    let mut sink = JsonLinesSink::new(Vec::new());
    let stats = engine(
        config(&server, "2024-01-01", "2024-01-02"),
        StateManager::in_memory(),
    )
    .run(&["team_table"], &mut sink)
    .await
    .unwrap();

    assert_eq!(stats.records_synced, 2);
    assert_eq!(stats.windows_synced, 2);

    let lines = parse_lines(&sink.into_inner());
    assert_eq!(lines[0]["type"], "SCHEMA");

    let records: Vec<&Value> = lines.iter().filter(|l| l["type"] == "RECORD").collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["record"]["teammate_v"], "Andrew");
    assert_eq!(records[0]["record"]["analytics_date"], "2024-01-01");
    assert_eq!(records[1]["record"]["teammate_v"], "Bea");
    assert_eq!(records[1]["record"]["analytics_date"], "2024-01-02");

    let declared: BTreeSet<String> = StreamDefinition::find("team_table")
        .unwrap()
        .field_names()
        .into_iter()
        .collect();
    for record in &records {
        let keys: BTreeSet<String> = record["record"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, declared);
    }

    let last = lines.last().unwrap();
    assert_eq!(last["type"], "STATE");
    assert_eq!(
        last["value"],
        json!({
            "bookmarks": {"team_table": {"date_to_resume": "2024-01-03 00:00:00"}},
            "currently_syncing": null
        })
    );

    // Each window is requested twice
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_state_file_resume() {
    let server = MockServer::start().await;
    for (day, name) in [(1, "a"), (2, "b"), (3, "c")] {
        mount_team_day(&server, day, name).await;
    }

    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    let mut sink = MemorySink::new();
    engine(
        config(&server, "2024-01-01", "2024-01-02"),
        StateManager::from_file(&state_path).unwrap(),
    )
    .run(&["team_table"], &mut sink)
    .await
    .unwrap();

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(
        saved["bookmarks"]["team_table"]["date_to_resume"],
        "2024-01-03 00:00:00"
    );
    server.reset().await;
    mount_team_day(&server, 3, "c").await;

    // Same start date, later end: only the new day is fetched
    let mut sink = MemorySink::new();
    let stats = engine(
        config(&server, "2024-01-01", "2024-01-03"),
        StateManager::from_file(&state_path).unwrap(),
    )
    .run(&["team_table"], &mut sink)
    .await
    .unwrap();

    assert_eq!(stats.windows_synced, 1);
    assert_eq!(sink.records("team_table")[0]["analytics_date"], json!("2024-01-03"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|r| r.url.query().unwrap_or("").contains(&format!("start={}", epoch(3)))));
}

fn parquet_parts(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut parts: Vec<_> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("parquet"))
                .collect()
        })
        .unwrap_or_default();
    parts.sort();
    parts
}

fn parquet_rows(dir: &std::path::Path) -> usize {
    parquet_parts(dir)
        .into_iter()
        .map(|path| {
            let file = std::fs::File::open(path).unwrap();
            ParquetRecordBatchReaderBuilder::try_new(file)
                .unwrap()
                .build()
                .unwrap()
                .map(|b| b.unwrap().num_rows())
                .sum::<usize>()
        })
        .sum()
}

#[tokio::test]
async fn test_parquet_output() {
    let server = MockServer::start().await;
    mount_team_day(&server, 1, "Andrew").await;
    mount_team_day(&server, 2, "Bea").await;

    let dir = tempfile::tempdir().unwrap();
    let mut sink = ParquetSink::new(dir.path(), Box::new(MemorySink::new()));
    engine(
        config(&server, "2024-01-01", "2024-01-02"),
        StateManager::in_memory(),
    )
    .run(&["team_table"], &mut sink)
    .await
    .unwrap();

    // One part per window, on disk before finish
    let stream_dir = dir.path().join("team_table");
    let parts = parquet_parts(&stream_dir);
    assert_eq!(parts.len(), 2);
    assert_eq!(parquet_rows(&stream_dir), 2);

    let file = std::fs::File::open(&parts[0]).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
    assert_eq!(
        reader.schema().fields().len(),
        StreamDefinition::find("team_table").unwrap().fields.len()
    );

    sink.finish().unwrap();
    assert_eq!(parquet_rows(&stream_dir), 2);
}

#[tokio::test]
async fn test_parquet_resume_into_same_directory() {
    let server = MockServer::start().await;
    for (day, name) in [(1, "a"), (2, "b")] {
        mount_team_day(&server, day, name).await;
    }

    let work = tempfile::tempdir().unwrap();
    let state_path = work.path().join("state.json");
    let out = work.path().join("out");

    // First run is dropped without finish, as if the process were killed
    {
        let mut sink = ParquetSink::new(&out, Box::new(MemorySink::new()));
        engine(
            config(&server, "2024-01-01", "2024-01-02"),
            StateManager::from_file(&state_path).unwrap(),
        )
        .run(&["team_table"], &mut sink)
        .await
        .unwrap();
    }

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(
        saved["bookmarks"]["team_table"]["date_to_resume"],
        "2024-01-03 00:00:00"
    );
    assert_eq!(parquet_rows(&out.join("team_table")), 2);

    server.reset().await;
    mount_team_day(&server, 3, "c").await;

    let mut sink = ParquetSink::new(&out, Box::new(MemorySink::new()));
    engine(
        config(&server, "2024-01-01", "2024-01-03"),
        StateManager::from_file(&state_path).unwrap(),
    )
    .run(&["team_table"], &mut sink)
    .await
    .unwrap();
    sink.finish().unwrap();

    assert_eq!(parquet_parts(&out.join("team_table")).len(), 3);
    assert_eq!(parquet_rows(&out.join("team_table")), 3);
}

// ============================================================================
// Entity Reports
// ============================================================================

#[tokio::test]
async fn test_accounts_table_reports() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/accounts"))
        .and(query_param("page_token", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_results": [{"id": "acc_2", "name": "Globex"}],
            "_pagination": {"next": null}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_results": [{"id": "acc_1", "name": "Initech"}],
            "_pagination": {"next": format!("{uri}/accounts?page_token=2")}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/analytics/reports"))
        .and(body_partial_json(json!({"filters": {"account_ids": ["acc_1"]}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "status": "running",
            "_links": {"self": format!("{uri}/analytics/reports/rep_acc1")}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/analytics/reports"))
        .and(body_partial_json(json!({"filters": {"account_ids": ["acc_2"]}})))
        .respond_with(ResponseTemplate::new(400).set_body_string("unsupported filter"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/analytics/reports/rep_acc1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "done",
            "metrics": [
                {"id": "avg_first_response_time", "type": "duration", "value": 512.5},
                {"id": "num_messages_received", "type": "number", "value": 40}
            ]
        })))
        .mount(&server)
        .await;

    let mut sink = MemorySink::new();
    let stats = engine(
        config(&server, "2024-01-01", "2024-01-01"),
        StateManager::in_memory(),
    )
    .run(&["accounts_table"], &mut sink)
    .await
    .unwrap();

    assert_eq!(stats.records_synced, 1);
    assert_eq!(stats.reports_skipped, 1);

    let records = sink.records("accounts_table");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["report_id"], json!("rep_acc1"));
    assert_eq!(record["metric_id"], json!("acc_1"));
    assert_eq!(record["metric_description"], json!("Initech"));
    assert_eq!(record["analytics_range"], json!("daily"));
    assert_eq!(record["avg_first_response_time"], json!(512.5));
    assert_eq!(record["num_messages_received"], json!(40));
    assert_eq!(record["num_sla_breach"], Value::Null);

    let declared = StreamDefinition::find("accounts_table").unwrap().fields.len();
    assert_eq!(record.len(), declared);
}

// ============================================================================
// Credentials
// ============================================================================

#[tokio::test]
async fn test_check_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Acme"})))
        .mount(&server)
        .await;

    let client = FrontClient::from_tap_config(&config(&server, "2024-01-01", "2024-01-01")).unwrap();
    let me = client.check_credentials().await.unwrap();
    assert_eq!(me["name"], "Acme");
}

#[tokio::test]
async fn test_check_credentials_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let client = FrontClient::from_tap_config(&config(&server, "2024-01-01", "2024-01-01")).unwrap();
    let err = client.check_credentials().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}
