use async_trait::async_trait;
use lro_poller::PollResponse;
use serde_json::Value;
use tracing::debug;

use super::{
    LocationStrategy, LroState, OperationResourceStrategy, PollingStrategy, StatusCheckStrategy,
};
use crate::error::{Result, StrategyError};
use crate::pipeline::{HttpPipeline, HttpResponse};

/// Tries strategies in order and locks onto the first that accepts the
/// initial response. The choice is kept in [`LroState::selected_strategy`].
pub struct ChainedStrategy {
    strategies: Vec<Box<dyn PollingStrategy>>,
}

impl std::fmt::Debug for ChainedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}

impl Default for ChainedStrategy {
    /// Operation resource, then `Location`, then status check.
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(OperationResourceStrategy::default()),
                Box::new(LocationStrategy),
                Box::new(StatusCheckStrategy),
            ],
        }
    }
}

impl ChainedStrategy {
    /// Chain `strategies`, tried in the given order
    pub fn new(strategies: Vec<Box<dyn PollingStrategy>>) -> Result<Self> {
        if strategies.is_empty() {
            return Err(StrategyError::invalid_argument(
                "a strategy chain needs at least one strategy",
            ));
        }
        Ok(Self { strategies })
    }

    fn selected(&self, state: &LroState) -> Result<&dyn PollingStrategy> {
        state
            .selected_strategy
            .and_then(|index| self.strategies.get(index))
            .map(|strategy| &**strategy)
            .ok_or_else(|| StrategyError::unsupported("no strategy has accepted the operation"))
    }
}

#[async_trait]
impl PollingStrategy for ChainedStrategy {
    fn name(&self) -> &'static str {
        "chained"
    }

    fn can_poll(&self, initial: &HttpResponse) -> bool {
        self.strategies.iter().any(|s| s.can_poll(initial))
    }

    fn on_initial_response(
        &self,
        initial: &HttpResponse,
        state: &mut LroState,
    ) -> Result<PollResponse<Value>> {
        let (index, strategy) = self
            .strategies
            .iter()
            .enumerate()
            .find(|(_, s)| s.can_poll(initial))
            .ok_or_else(|| {
                StrategyError::unsupported(format!(
                    "no strategy can poll a {} response",
                    initial.status()
                ))
            })?;
        debug!(strategy = strategy.name(), "strategy selected");
        state.selected_strategy = Some(index);
        strategy.on_initial_response(initial, state)
    }

    async fn poll(
        &self,
        pipeline: &dyn HttpPipeline,
        state: &mut LroState,
    ) -> Result<PollResponse<Value>> {
        self.selected(state)?.poll(pipeline, state).await
    }

    async fn final_result(&self, pipeline: &dyn HttpPipeline, state: &LroState) -> Result<Value> {
        self.selected(state)?.final_result(pipeline, state).await
    }
}
