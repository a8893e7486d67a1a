//! Report polling
//!
//! The analytics endpoints compute results asynchronously and have no
//! "pending" status: an empty result means the report is not ready yet. The
//! poller repeats the request until data shows up or the timeout elapses.

use super::types::{
    AnalyticsResponse, Entity, EntityPage, RawReportRow, ReportHandle, ReportMetric,
    ReportResponse, REPORT_METRICS,
};
use crate::config::TapConfig;
use crate::cursor::SyncWindow;
use crate::error::{Error, Result};
use crate::http::{ApiRequest, Transport};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Path of the positional analytics endpoint
pub const ANALYTICS_PATH: &str = "/analytics";

/// Path of the reports endpoint
pub const REPORTS_PATH: &str = "/analytics/reports";

/// Polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep between attempts while the report is empty
    pub poll_interval: Duration,
    /// Give up after this long
    pub poll_timeout: Duration,
    /// Delay before the repeated analytics request
    pub report_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            poll_timeout: Duration::from_secs(1800),
            report_delay: Duration::from_secs(2),
        }
    }
}

impl PollConfig {
    /// Take the polling parameters from the tap config
    pub fn from_tap_config(config: &TapConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            poll_timeout: config.poll_timeout(),
            report_delay: config.report_delay(),
        }
    }
}

/// Fetches analytics data through a [`Transport`]
#[derive(Clone)]
pub struct ReportPoller {
    transport: Arc<dyn Transport>,
    config: PollConfig,
}

impl ReportPoller {
    /// Create a poller
    pub fn new(transport: Arc<dyn Transport>, config: PollConfig) -> Self {
        Self { transport, config }
    }

    /// Polling parameters
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    fn check_deadline(&self, stream: &str, started: Instant) -> Result<()> {
        if started.elapsed() >= self.config.poll_timeout {
            return Err(Error::JobTimeout {
                stream: stream.to_string(),
                timeout_secs: self.config.poll_timeout.as_secs(),
            });
        }
        Ok(())
    }

    /// Rows of the positional table `stream` for `window`.
    ///
    /// Each attempt sends the request, waits the report delay and sends it
    /// again; only the second response is read.
    pub async fn fetch_metric_rows(
        &self,
        stream: &str,
        window: &SyncWindow,
    ) -> Result<Vec<RawReportRow>> {
        let request = ApiRequest::get(ANALYTICS_PATH)
            .query("start", window.start_epoch().to_string())
            .query("end", window.end_epoch().to_string())
            .query("metrics[]", stream);

        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            self.check_deadline(stream, started)?;
            attempt += 1;
            info!("Metrics query {stream} {window} (attempt {attempt})");

            self.transport.send(request.clone()).await?;
            tokio::time::sleep(self.config.report_delay).await;
            let response = self.transport.send(request.clone().unpaced()).await?;

            let rows = response.json::<AnalyticsResponse>()?.into_rows(stream);
            if !rows.is_empty() {
                debug!("{stream}: {} rows for {window}", rows.len());
                return Ok(rows);
            }

            debug!(
                "{stream}: report not ready, sleeping {:?}",
                self.config.poll_interval
            );
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// All entities under `path`, following `_pagination.next`
    pub async fn list_entities(&self, path: &str, description_key: &str) -> Result<Vec<Entity>> {
        let mut entities = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(path.to_string());

        while let Some(url) = next.take() {
            if !seen.insert(url.clone()) {
                warn!("Pagination loop detected at {url}, stopping");
                break;
            }

            let page: EntityPage = self.transport.send(ApiRequest::get(&url)).await?.json()?;

            for result in &page.results {
                match Entity::from_result(result, description_key) {
                    Some(entity) => entities.push(entity),
                    None => warn!("Skipping {path} result without id"),
                }
            }

            next = page
                .pagination
                .and_then(|p| p.next)
                .filter(|n| !n.is_empty());
        }

        debug!("{path}: {} entities", entities.len());
        Ok(entities)
    }

    /// Create a report for `window` filtered to one entity.
    ///
    /// Returns `None` when the API refuses the report (HTTP 400) or does not
    /// return a report link.
    pub async fn submit(
        &self,
        window: &SyncWindow,
        filter: &str,
        entity_id: &str,
    ) -> Result<Option<ReportHandle>> {
        let mut filters = serde_json::Map::new();
        filters.insert(filter.to_string(), json!([entity_id]));

        let body = json!({
            "start": window.start_epoch(),
            "end": window.end_epoch(),
            "metrics": REPORT_METRICS,
            "filters": filters,
        });

        let response = match self.transport.send(ApiRequest::post(REPORTS_PATH, body)).await {
            Ok(response) => response,
            Err(Error::HttpStatus { status: 400, body }) => {
                warn!("Report for {filter}={entity_id} rejected, skipping: {body}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let report: ReportResponse = response.json()?;
        match report.links.and_then(|l| l.self_link) {
            Some(url) if !url.is_empty() => Ok(Some(ReportHandle::new(url))),
            _ => {
                warn!("Report for {filter}={entity_id} returned no link, skipping");
                Ok(None)
            }
        }
    }

    /// Poll a submitted report until its metrics are available
    pub async fn await_report(
        &self,
        stream: &str,
        handle: &ReportHandle,
    ) -> Result<Vec<ReportMetric>> {
        let started = Instant::now();

        loop {
            self.check_deadline(stream, started)?;
            debug!("Polling report {}", handle.url);

            let report: ReportResponse = self
                .transport
                .send(ApiRequest::get(&handle.url))
                .await?
                .json()?;

            if !report.metrics.is_empty() {
                return Ok(report.metrics);
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

impl std::fmt::Debug for ReportPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportPoller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
