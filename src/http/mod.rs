//! HTTP transport
//!
//! Authenticated calls to the Front API with server-budget awareness,
//! client-side pacing, and rule-based retries.
//!
//! # Features
//!
//! - **Rate budget**: waits for the reset when the server reports zero calls left
//! - **Pacing**: token bucket (governor) allowing one call per interval
//! - **Retries**: exponential for 429/503, fixed interval for 423

mod client;
mod rate_limit;
mod retry;

pub use client::{
    ApiRequest, ApiResponse, FrontClient, HttpClientConfig, HttpClientConfigBuilder, Transport,
};
pub use rate_limit::{CallPacer, RateBudget, MAX_BUDGET_WAIT_SECS};
pub use retry::{Backoff, RetryPolicy, RetryRule, RetryTracker};

#[cfg(test)]
mod scripted;
#[cfg(test)]
pub(crate) use scripted::ScriptedTransport;
