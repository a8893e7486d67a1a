//! Analytics report retrieval
//!
//! Two flavors:
//! - positional tables (`GET /analytics`), polled until rows appear
//! - entity reports (`POST /analytics/reports`), submitted per entity and
//!   awaited through the returned report link

mod poller;
mod types;

pub use poller::{PollConfig, ReportPoller, ANALYTICS_PATH, REPORTS_PATH};
pub use types::{
    AnalyticsResponse, AnalyticsTable, Entity, RawCell, RawReportRow, ReportHandle,
    ReportMetric, REPORT_METRICS,
};
