use async_trait::async_trait;
use http::header::{HeaderName, LOCATION};
use http::{Method, StatusCode};
use lro_poller::{OperationStatus, PollResponse};
use serde_json::Value;
use tracing::debug;

use super::{LroState, PollingStrategy, decode_body, get_json, observed};
use crate::error::{Result, StrategyError};
use crate::pipeline::{HttpPipeline, HttpResponse};
use crate::status::service_status;

const OPERATION_LOCATION: &str = "operation-location";
const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Operations that expose a separate status resource.
///
/// The initial response names the status resource in one of a set of
/// headers (`Operation-Location`, then `Azure-AsyncOperation` by default).
/// Each poll reads its body's `status` field; a `resourceLocation` field
/// names where the result will be.
#[derive(Debug, Clone)]
pub struct OperationResourceStrategy {
    headers: Vec<HeaderName>,
}

impl Default for OperationResourceStrategy {
    fn default() -> Self {
        Self {
            headers: vec![
                HeaderName::from_static(OPERATION_LOCATION),
                HeaderName::from_static(AZURE_ASYNC_OPERATION),
            ],
        }
    }
}

impl OperationResourceStrategy {
    /// Look for the status resource in `headers`, first match wins
    pub fn with_headers(headers: impl IntoIterator<Item = HeaderName>) -> Self {
        Self {
            headers: headers.into_iter().collect(),
        }
    }

    fn operation_header<'a>(&self, response: &'a HttpResponse) -> Option<(&HeaderName, &'a str)> {
        self.headers.iter().find_map(|name| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| (name, v))
        })
    }
}

#[async_trait]
impl PollingStrategy for OperationResourceStrategy {
    fn name(&self) -> &'static str {
        "operation-resource"
    }

    fn can_poll(&self, initial: &HttpResponse) -> bool {
        self.operation_header(initial).is_some()
    }

    fn on_initial_response(
        &self,
        initial: &HttpResponse,
        state: &mut LroState,
    ) -> Result<PollResponse<Value>> {
        if !matches!(
            initial.status(),
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT
        ) {
            return Err(StrategyError::unexpected_status(initial));
        }

        let (header, raw) = self
            .operation_header(initial)
            .ok_or_else(|| StrategyError::MissingHeader {
                header: OPERATION_LOCATION.to_string(),
            })?;
        state.poll_url = Some(state.resolve(raw)?);
        state.location_url = state.header_url(initial.headers(), LOCATION.as_str())?;
        state.last_body = decode_body(initial.body())?;
        debug!(%header, poll_url = ?state.poll_url, "tracking operation resource");

        Ok(observed(
            OperationStatus::IN_PROGRESS,
            state.last_body.clone(),
            initial.headers(),
        ))
    }

    async fn poll(
        &self,
        pipeline: &dyn HttpPipeline,
        state: &mut LroState,
    ) -> Result<PollResponse<Value>> {
        let url = state.require_poll_url()?.clone();
        let response = super::get(pipeline, &url).await?;
        if !response.status().is_success() {
            return Err(StrategyError::unexpected_status(&response));
        }
        let body = decode_body(response.body())?;

        let status = body
            .get("status")
            .and_then(Value::as_str)
            .map(service_status)
            .ok_or_else(|| StrategyError::decode("operation body has no 'status' string"))?;
        if let Some(resource) = body.get("resourceLocation").and_then(Value::as_str) {
            state.final_url = Some(state.resolve(resource)?);
        }
        state.last_body = body.clone();

        Ok(observed(status, body, response.headers()))
    }

    /// `resourceLocation` when the service named one; otherwise the
    /// request URL for PUT and PATCH, the initial `Location` for POST, and
    /// the last status body for anything else.
    async fn final_result(&self, pipeline: &dyn HttpPipeline, state: &LroState) -> Result<Value> {
        let target = state.final_url.as_ref().or(match state.request_method {
            Method::PUT | Method::PATCH => Some(&state.request_url),
            Method::POST => state.location_url.as_ref(),
            _ => None,
        });
        match target {
            Some(url) => get_json(pipeline, url).await,
            None => Ok(state.last_body.clone()),
        }
    }
}
