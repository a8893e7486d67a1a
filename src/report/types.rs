//! Wire types for the analytics endpoints

use crate::types::{JsonObject, JsonValue};
use serde::{Deserialize, Serialize};

/// Metric ids requested from the reports API
pub const REPORT_METRICS: [&str; 19] = [
    "avg_first_response_time",
    "avg_handle_time",
    "avg_response_time",
    "avg_sla_breach_time",
    "avg_total_reply_time",
    "new_segments_count",
    "num_active_segments_full",
    "num_archived_segments",
    "num_archived_segments_with_reply",
    "num_csat_survey_response",
    "num_messages_received",
    "num_messages_sent",
    "num_sla_breach",
    "pct_csat_survey_satisfaction",
    "pct_tagged_conversations",
    "num_open_segments_start",
    "num_closed_segments",
    "num_open_segments_end",
    "num_workload_segments",
];

// ============================================================================
// Positional Analytics
// ============================================================================

/// One cell of a positional row.
///
/// Keeps the raw JSON object so an absent key can be told apart from `null`.
/// Both the short (`v`, `p`, `t`) and long (`value`, `previous_value`,
/// `type`) key spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawCell(JsonObject);

impl RawCell {
    /// Wrap a JSON object
    pub fn new(fields: JsonObject) -> Self {
        Self(fields)
    }

    /// Build from a JSON value; `None` unless it is an object
    pub fn from_value(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    fn lookup(&self, short: &str, long: &str) -> Option<&JsonValue> {
        self.0.get(short).or_else(|| self.0.get(long))
    }

    /// Current value
    pub fn value(&self) -> Option<&JsonValue> {
        self.lookup("v", "value")
    }

    /// Value of the previous period
    pub fn previous_value(&self) -> Option<&JsonValue> {
        self.lookup("p", "previous_value")
    }

    /// Link of an identity-bearing cell
    pub fn url(&self) -> Option<&JsonValue> {
        self.0.get("url")
    }

    /// Id of an identity-bearing cell
    pub fn id(&self) -> Option<&JsonValue> {
        self.0.get("id")
    }
}

/// Ordered cells of one positional row
pub type RawReportRow = Vec<RawCell>;

/// Body of `GET /analytics`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsResponse {
    #[serde(default)]
    pub metrics: Vec<AnalyticsTable>,
}

/// One metric table in an analytics response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsTable {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub rows: Vec<RawReportRow>,
}

impl AnalyticsResponse {
    /// Rows of the table named `metric`, else of the first table
    pub fn into_rows(self, metric: &str) -> Vec<RawReportRow> {
        let mut tables = self.metrics;
        let idx = tables
            .iter()
            .position(|t| t.id.as_deref() == Some(metric))
            .unwrap_or(0);

        if idx < tables.len() {
            tables.swap_remove(idx).rows
        } else {
            Vec::new()
        }
    }
}

// ============================================================================
// Entity Reports
// ============================================================================

/// Location of a submitted report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHandle {
    pub url: String,
}

impl ReportHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Last path segment of the report URL
    pub fn report_id(&self) -> &str {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.url)
    }
}

/// One metric value in a finished report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetric {
    pub id: String,
    #[serde(default, rename = "type")]
    pub metric_type: Option<String>,
    #[serde(default)]
    pub value: JsonValue,
}

/// Body of `POST /analytics/reports` and `GET <report url>`
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ReportResponse {
    #[serde(default)]
    pub metrics: Vec<ReportMetric>,
    #[serde(default, rename = "_links")]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Links {
    #[serde(default, rename = "self")]
    pub self_link: Option<String>,
}

/// One page of an entity listing
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct EntityPage {
    #[serde(default, rename = "_results")]
    pub results: Vec<JsonValue>,
    #[serde(default, rename = "_pagination")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
}

/// An account, channel, inbox, tag, teammate or team to report on
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Entity id used in report filters
    pub id: String,
    /// Human-readable label (`name`, or `email` for teammates)
    pub description: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            description,
        }
    }

    /// Extract from a listing result; `None` when there is no usable id
    pub fn from_result(result: &JsonValue, description_key: &str) -> Option<Self> {
        let id = match result.get("id")? {
            JsonValue::String(s) if !s.is_empty() => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            _ => return None,
        };

        let description = result
            .get(description_key)
            .and_then(JsonValue::as_str)
            .map(ToString::to_string);

        Some(Self { id, description })
    }
}
