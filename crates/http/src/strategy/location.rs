use async_trait::async_trait;
use http::StatusCode;
use http::header::LOCATION;
use lro_poller::{OperationStatus, PollResponse};
use serde_json::Value;

use super::{LroState, PollingStrategy, decode_body, get, get_json, observed};
use crate::error::{Result, StrategyError};
use crate::pipeline::{HttpPipeline, HttpResponse};

/// Operations polled through the `Location` header.
///
/// `202 Accepted` means still running; `200`, `201` or `204` means done.
/// A `Location` header on any response moves the poll URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationStrategy;

impl LocationStrategy {
    fn status_of(response: &HttpResponse) -> Result<OperationStatus> {
        match response.status() {
            StatusCode::ACCEPTED => Ok(OperationStatus::IN_PROGRESS),
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => {
                Ok(OperationStatus::SUCCESSFULLY_COMPLETED)
            }
            _ => Err(StrategyError::unexpected_status(response)),
        }
    }

    fn observe(response: &HttpResponse, state: &mut LroState) -> Result<PollResponse<Value>> {
        let status = Self::status_of(response)?;
        if let Some(url) = state.header_url(response.headers(), LOCATION.as_str())? {
            state.poll_url = Some(url);
        }
        state.last_body = decode_body(response.body())?;
        Ok(observed(status, state.last_body.clone(), response.headers()))
    }
}

#[async_trait]
impl PollingStrategy for LocationStrategy {
    fn name(&self) -> &'static str {
        "location"
    }

    fn can_poll(&self, initial: &HttpResponse) -> bool {
        initial.headers().contains_key(LOCATION)
    }

    fn on_initial_response(
        &self,
        initial: &HttpResponse,
        state: &mut LroState,
    ) -> Result<PollResponse<Value>> {
        let response = Self::observe(initial, state)?;
        state.location_url.clone_from(&state.poll_url);
        Ok(response)
    }

    async fn poll(
        &self,
        pipeline: &dyn HttpPipeline,
        state: &mut LroState,
    ) -> Result<PollResponse<Value>> {
        let url = state.require_poll_url()?.clone();
        let response = get(pipeline, &url).await?;
        Self::observe(&response, state)
    }

    /// The body of the final poll, or a fresh read of the last poll URL
    /// when that body was empty.
    async fn final_result(&self, pipeline: &dyn HttpPipeline, state: &LroState) -> Result<Value> {
        if !state.last_body.is_null() {
            return Ok(state.last_body.clone());
        }
        get_json(pipeline, state.require_poll_url()?).await
    }
}
