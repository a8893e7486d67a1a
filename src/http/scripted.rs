//! In-process transport replaying canned responses

use super::client::{ApiRequest, ApiResponse, Transport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays queued responses in order and records every request.
/// Once the queue is drained the fallback body (if any) is returned.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ApiResponse>>>,
    fallback: Option<Value>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_fallback(mut self, body: Value) -> Self {
        self.fallback = Some(body);
        self
    }

    pub(crate) fn push_json(&self, body: Value) -> &Self {
        self.push(Ok(ApiResponse::json_body(&body)))
    }

    pub(crate) fn push_err(&self, error: Error) -> &Self {
        self.push(Err(error))
    }

    pub(crate) fn push(&self, response: Result<ApiResponse>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);

        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }

        match &self.fallback {
            Some(body) => Ok(ApiResponse::json_body(body)),
            None => Err(Error::Other(format!("no scripted response for {path}"))),
        }
    }
}
