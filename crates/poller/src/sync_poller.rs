//! Blocking facade over [`Poller`].
//!
//! Every call drives the same state machine as the async poller on a
//! private current-thread runtime. Time-bounded waits run each poll as a
//! spawned task and abandon it at the bound; an abandoned poll is aborted
//! and its result never reaches the context.

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tracing::{debug, warn};

use crate::config::{ActivationMode, PollerConfig, WaitOptions};
use crate::context::PollingContext;
use crate::error::{PollerError, Result, TimeoutKind};
use crate::poller::{Polled, Poller};
use crate::response::PollResponse;
use crate::status::OperationStatus;

const RUNTIME_THREAD_NAME: &str = "lro-sync-poller";

/// Runtime that is shut down without waiting for blocking callbacks, so a
/// facade can be dropped while an abandoned callback is still sleeping.
struct FacadeRuntime(Option<Runtime>);

impl Deref for FacadeRuntime {
    type Target = Runtime;

    fn deref(&self) -> &Runtime {
        self.0.as_ref().expect("runtime is only taken on drop")
    }
}

impl Drop for FacadeRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

/// How a bounded wait ended.
enum WaitOutcome<T> {
    Reached(PollResponse<T>),
    TimedOut {
        latest: PollResponse<T>,
        error: PollerError,
    },
}

/// Pull-style poller.
///
/// Methods block the calling thread and must not be called from inside an
/// async runtime; use [`Poller`] there.
pub struct SyncPoller<T, U> {
    poller: Poller<T, U>,
    runtime: FacadeRuntime,
}

impl<T, U> std::fmt::Debug for SyncPoller<T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPoller")
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

impl<T, U> SyncPoller<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Send + 'static,
{
    /// Wrap an async poller.
    ///
    /// Runs activation immediately when the poller is configured with
    /// [`ActivationMode::Eager`]; an activation failure fails construction.
    pub fn new(poller: Poller<T, U>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .thread_name(RUNTIME_THREAD_NAME)
            .enable_time()
            .build()
            .map_err(|e| PollerError::Runtime {
                message: format!("failed to build facade runtime: {e}"),
            })?;

        let facade = Self {
            poller,
            runtime: FacadeRuntime(Some(runtime)),
        };
        if facade.poller.config().activation == ActivationMode::Eager {
            debug!("eager activation");
            facade.runtime.block_on(facade.poller.activate())?;
        }
        Ok(facade)
    }

    /// The async poller driven by this facade
    pub fn as_async(&self) -> &Poller<T, U> {
        &self.poller
    }

    /// Current configuration
    pub fn config(&self) -> PollerConfig {
        self.poller.config()
    }

    /// Change the wait between polls
    pub fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        self.poller.set_poll_interval(interval)
    }

    /// Snapshot of the polling context
    pub fn context(&self) -> PollingContext<T> {
        self.poller.context()
    }

    /// Latest recorded response
    pub fn latest_response(&self) -> Option<PollResponse<T>> {
        self.poller.latest_response()
    }

    /// Latest known status
    pub fn status(&self) -> Option<OperationStatus> {
        self.poller.status()
    }

    /// Poll once, immediately.
    ///
    /// Returns the cached response once the operation is terminal.
    pub fn poll(&self) -> Result<PollResponse<T>> {
        self.runtime.block_on(self.poller.poll_once())
    }

    /// Block until a terminal status, using the configured default timeouts
    pub fn wait_for_completion(&self) -> Result<PollResponse<T>> {
        self.wait_for_completion_with(WaitOptions::new())
    }

    /// Block until a terminal status.
    ///
    /// Either bound elapsing fails with [`PollerError::Timeout`]; responses
    /// observed before that stay in the context.
    pub fn wait_for_completion_with(&self, options: WaitOptions) -> Result<PollResponse<T>> {
        match self.drive(options, None)? {
            WaitOutcome::Reached(response) => Ok(response),
            WaitOutcome::TimedOut { error, .. } => Err(error),
        }
    }

    /// Block until `status` or a terminal status, using the configured
    /// default timeouts
    pub fn wait_until(&self, status: &OperationStatus) -> Result<PollResponse<T>> {
        self.wait_until_with(status, WaitOptions::new())
    }

    /// Block until `status` or a terminal status.
    ///
    /// A timeout is not an error here: the last observed response is
    /// returned instead. Callback failures still propagate.
    pub fn wait_until_with(
        &self,
        status: &OperationStatus,
        options: WaitOptions,
    ) -> Result<PollResponse<T>> {
        match self.drive(options, Some(status))? {
            WaitOutcome::Reached(response) => Ok(response),
            WaitOutcome::TimedOut { latest, error } => {
                debug!(%error, status = %latest.status(), "wait_until gave up, returning latest response");
                Ok(latest)
            }
        }
    }

    /// Block until completion, then fetch the final result, using the
    /// configured default timeouts
    pub fn final_result(&self) -> Result<U> {
        self.final_result_with(WaitOptions::new())
    }

    /// Block until completion, then fetch the final result.
    ///
    /// Timeouts behave as in [`SyncPoller::wait_for_completion_with`]; the
    /// fetch itself is unbounded.
    pub fn final_result_with(&self, options: WaitOptions) -> Result<U> {
        self.wait_for_completion_with(options)?;
        self.runtime
            .block_on(self.poller.shared.fetch_result(self.poller.context()))
    }

    /// Ask the service to cancel the operation
    pub fn cancel_operation(&self) -> Result<T> {
        self.runtime.block_on(self.poller.cancel_operation())
    }

    fn drive(
        &self,
        options: WaitOptions,
        target: Option<&OperationStatus>,
    ) -> Result<WaitOutcome<T>> {
        options.validate()?;
        let options = options.or(self.poller.config().wait_options());
        let started = Instant::now();

        let activation = self.runtime.block_on(self.poller.activate())?;
        let mut latest = self.poller.latest_response().unwrap_or(activation);
        let mut first = true;

        loop {
            if let Some(current) = self.poller.latest_response() {
                latest = current;
            }
            if latest.is_complete() || target.is_some_and(|t| latest.status() == t) {
                return Ok(WaitOutcome::Reached(latest));
            }

            let bound = match step_bound(options, started.elapsed()) {
                Ok(bound) => bound,
                Err(error) => return Ok(WaitOutcome::TimedOut { latest, error }),
            };
            let delay = if first {
                Duration::ZERO
            } else {
                self.poller.poll_delay(&latest)
            };
            first = false;

            match self.bounded_poll(delay, bound)? {
                Ok(polled) => latest = self.poller.commit(polled),
                Err(error) => return Ok(WaitOutcome::TimedOut { latest, error }),
            }
        }
    }

    /// Run one poll, abandoning it at `bound`.
    ///
    /// The outer result carries callback and runtime failures; the inner
    /// one a timeout.
    fn bounded_poll(
        &self,
        delay: Duration,
        bound: Option<(Duration, TimeoutKind)>,
    ) -> Result<std::result::Result<Polled<T>, PollerError>> {
        let task = self.poller.poll_task(delay);
        let Some((limit, kind)) = bound else {
            return self.runtime.block_on(task).map(Ok);
        };

        let mut handle = self.runtime.spawn(task);
        let outcome = self
            .runtime
            .block_on(async { tokio::time::timeout(limit, &mut handle).await });
        match outcome {
            Ok(Ok(result)) => result.map(Ok),
            Ok(Err(join)) => Err(PollerError::Runtime {
                message: format!("poll task failed: {join}"),
            }),
            Err(elapsed) => {
                handle.abort();
                warn!(%kind, ?limit, "poll abandoned at timeout");
                Ok(Err(PollerError::timeout(
                    kind,
                    limit,
                    Some(Arc::new(elapsed)),
                )))
            }
        }
    }
}

/// Bound for the next poll: the per-poll timeout, or the remaining overall
/// budget when that is tighter. Fails once the overall budget is spent.
fn step_bound(
    options: WaitOptions,
    elapsed: Duration,
) -> std::result::Result<Option<(Duration, TimeoutKind)>, PollerError> {
    let remaining = match options.overall_timeout {
        Some(overall) => match overall.checked_sub(elapsed).filter(|r| !r.is_zero()) {
            Some(remaining) => Some(remaining),
            None => {
                return Err(PollerError::timeout(TimeoutKind::Overall, overall, None));
            }
        },
        None => None,
    };

    Ok(match (options.poll_timeout, remaining) {
        (Some(per_poll), Some(remaining)) if per_poll <= remaining => {
            Some((per_poll, TimeoutKind::PerPoll))
        }
        (_, Some(remaining)) => Some((remaining, TimeoutKind::Overall)),
        (Some(per_poll), None) => Some((per_poll, TimeoutKind::PerPoll)),
        (None, None) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[rstest]
    #[case::unbounded(WaitOptions::new(), 0, None)]
    #[case::per_poll_only(WaitOptions::new().with_poll_timeout(ms(100)), 50, Some((ms(100), TimeoutKind::PerPoll)))]
    #[case::per_poll_tighter(
        WaitOptions::new().with_poll_timeout(ms(100)).with_overall_timeout(ms(5000)),
        1000,
        Some((ms(100), TimeoutKind::PerPoll))
    )]
    #[case::overall_tighter(
        WaitOptions::new().with_poll_timeout(ms(100)).with_overall_timeout(ms(5000)),
        4950,
        Some((ms(50), TimeoutKind::Overall))
    )]
    #[case::overall_only(WaitOptions::new().with_overall_timeout(ms(300)), 100, Some((ms(200), TimeoutKind::Overall)))]
    fn next_poll_bound(
        #[case] options: WaitOptions,
        #[case] elapsed_ms: u64,
        #[case] expected: Option<(Duration, TimeoutKind)>,
    ) {
        assert_eq!(step_bound(options, ms(elapsed_ms)).unwrap(), expected);
    }

    #[test]
    fn spent_overall_budget_times_out() {
        let options = WaitOptions::new().with_overall_timeout(ms(300));
        let err = step_bound(options, ms(300)).unwrap_err();
        assert_eq!(err.timeout_kind(), Some(TimeoutKind::Overall));
    }
}
