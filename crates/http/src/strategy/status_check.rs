use async_trait::async_trait;
use http::StatusCode;
use lro_poller::{OperationStatus, PollResponse};
use serde_json::Value;

use super::{LroState, PollingStrategy, decode_body, observed};
use crate::error::{Result, StrategyError};
use crate::pipeline::{HttpPipeline, HttpResponse};

/// Fallback for services that finish within the initial request.
///
/// A `200`, `201`, `202` or `204` initial response is terminal success and
/// its body is the result. There is nothing to poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusCheckStrategy;

#[async_trait]
impl PollingStrategy for StatusCheckStrategy {
    fn name(&self) -> &'static str {
        "status-check"
    }

    fn can_poll(&self, _initial: &HttpResponse) -> bool {
        true
    }

    fn on_initial_response(
        &self,
        initial: &HttpResponse,
        state: &mut LroState,
    ) -> Result<PollResponse<Value>> {
        match initial.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {
                state.last_body = decode_body(initial.body())?;
                Ok(observed(
                    OperationStatus::SUCCESSFULLY_COMPLETED,
                    state.last_body.clone(),
                    initial.headers(),
                ))
            }
            _ => Err(StrategyError::unexpected_status(initial)),
        }
    }

    async fn poll(
        &self,
        _pipeline: &dyn HttpPipeline,
        _state: &mut LroState,
    ) -> Result<PollResponse<Value>> {
        Err(StrategyError::unsupported(
            "status-check operations complete with the initial response",
        ))
    }

    async fn final_result(&self, _pipeline: &dyn HttpPipeline, state: &LroState) -> Result<Value> {
        Ok(state.last_body.clone())
    }
}
