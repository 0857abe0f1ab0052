//! Completion-detection strategies.
//!
//! A strategy reads the response to the request that started an operation,
//! decides where to poll, interprets each poll response and finally knows
//! how to obtain the operation's result. Strategies keep what they learn in
//! an [`LroState`] owned by the caller.

mod chained;
mod location;
mod operation_resource;
mod status_check;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, Request};
use lro_poller::{OperationStatus, PollResponse};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Result, StrategyError};
use crate::pipeline::{HttpPipeline, HttpResponse};
use crate::resolve::resolve_url;
use crate::retry_after::retry_after;

pub use chained::ChainedStrategy;
pub use location::LocationStrategy;
pub use operation_resource::OperationResourceStrategy;
pub use status_check::StatusCheckStrategy;

/// What a strategy has learned about one operation.
#[derive(Debug, Clone)]
pub struct LroState {
    /// Method of the request that started the operation
    pub request_method: Method,
    /// URL of the request that started the operation
    pub request_url: Url,
    /// Base for relative URLs returned by the service
    pub endpoint: Option<Url>,
    /// Where the next poll goes
    pub poll_url: Option<Url>,
    /// `Location` header of the initial response
    pub location_url: Option<Url>,
    /// Where the final result lives, when the service says so
    pub final_url: Option<Url>,
    /// Body of the most recent response
    pub last_body: Value,
    /// Strategy a [`ChainedStrategy`] locked onto
    pub selected_strategy: Option<usize>,
}

impl LroState {
    /// State for an operation started with `method` on `url`
    pub fn new(request_method: Method, request_url: Url) -> Self {
        Self {
            request_method,
            request_url,
            endpoint: None,
            poll_url: None,
            location_url: None,
            final_url: None,
            last_body: Value::Null,
            selected_strategy: None,
        }
    }

    /// Set the base for relative URLs
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub(crate) fn resolve(&self, raw: &str) -> Result<Url> {
        resolve_url(self.endpoint.as_ref(), raw)
    }

    pub(crate) fn header_url(&self, headers: &HeaderMap, name: &str) -> Result<Option<Url>> {
        match headers.get(name).map(|v| v.to_str()) {
            None => Ok(None),
            Some(Ok(raw)) => self.resolve(raw).map(Some),
            Some(Err(_)) => Err(StrategyError::invalid_argument(format!(
                "'{name}' header is not valid text"
            ))),
        }
    }

    pub(crate) fn require_poll_url(&self) -> Result<&Url> {
        self.poll_url
            .as_ref()
            .ok_or_else(|| StrategyError::unsupported("no poll url; the initial response was not handled"))
    }
}

/// Drives one kind of long-running HTTP operation.
#[async_trait]
pub trait PollingStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether this strategy understands the initial response
    fn can_poll(&self, initial: &HttpResponse) -> bool;

    /// Record what the initial response says and report the first status
    fn on_initial_response(
        &self,
        initial: &HttpResponse,
        state: &mut LroState,
    ) -> Result<PollResponse<Value>>;

    /// Poll once
    async fn poll(
        &self,
        pipeline: &dyn HttpPipeline,
        state: &mut LroState,
    ) -> Result<PollResponse<Value>>;

    /// Obtain the result of a successfully finished operation
    async fn final_result(&self, pipeline: &dyn HttpPipeline, state: &LroState) -> Result<Value>;
}

/// Send a GET for `url` and return the raw response.
pub(crate) async fn get(pipeline: &dyn HttpPipeline, url: &Url) -> Result<HttpResponse> {
    let request = Request::get(url.as_str())
        .body(Bytes::new())
        .map_err(|e| StrategyError::invalid_argument(format!("cannot build GET {url}: {e}")))?;
    debug!(%url, "GET");
    pipeline
        .send(request)
        .await
        .map_err(StrategyError::transport)
}

/// Send a GET for `url`, require a 2xx status and decode the body.
pub(crate) async fn get_json(pipeline: &dyn HttpPipeline, url: &Url) -> Result<Value> {
    let response = get(pipeline, url).await?;
    if !response.status().is_success() {
        return Err(StrategyError::unexpected_status(&response));
    }
    decode_body(response.body())
}

/// Decode a JSON body; an empty body is `null`.
pub(crate) fn decode_body(body: &Bytes) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Build a poll response carrying the body and any server-suggested delay.
pub(crate) fn observed(
    status: OperationStatus,
    body: Value,
    headers: &HeaderMap,
) -> PollResponse<Value> {
    let response = PollResponse::new(status, body);
    match retry_after(headers) {
        Some(delay) => response.with_retry_after(delay),
        None => response,
    }
}
