//! Core poller state machine.
//!
//! A [`Poller`] drives one long-running operation:
//!
//! ```text
//! NOT_YET_ACTIVATED -> ACTIVATING -> POLLING <-> POLLING -> TERMINAL(status)
//! ```
//!
//! Activation runs at most once per poller, whichever consumer gets there
//! first, and keeps running for the next consumer if the first one is
//! dropped. Polls are serialized: at most one is in flight per poller, and
//! the terminal check, the callback and the recording happen under one
//! gate. Once a terminal status is recorded every further poll request
//! returns the cached terminal response. Cancel and fetch-result are
//! pass-through calls that never change the tracked status.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared as SharedFuture};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, trace, warn};

use crate::builder::PollerBuilder;
use crate::config::{PollerConfig, validate_poll_interval};
use crate::context::PollingContext;
use crate::error::{PollerError, Result, Stage};
use crate::operation::Operations;
use crate::response::PollResponse;
use crate::status::OperationStatus;

/// Async poller over one long-running operation.
///
/// Cloning is cheap; clones share the activation latch, the context and the
/// configured interval.
pub struct Poller<T, U> {
    pub(crate) shared: Arc<Shared<T, U>>,
}

impl<T, U> Clone for Poller<T, U> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, U> fmt::Debug for Poller<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("config", &*self.shared.config.read())
            .field("activated", &self.shared.context.lock().is_activated())
            .finish_non_exhaustive()
    }
}

/// Activation shared by every consumer. Any awaiter drives it; dropping
/// one awaiter leaves it for the next.
type Activation<T> = SharedFuture<BoxFuture<'static, Result<PollResponse<T>>>>;

/// Outcome of a detached poll, see [`Poller::poll_task`].
pub(crate) enum Polled<T> {
    /// The operation was already terminal; nothing to record.
    Cached(PollResponse<T>),
    /// A fresh response, still holding the poll gate until recorded.
    Fresh(PollResponse<T>, OwnedMutexGuard<()>),
}

pub(crate) struct Shared<T, U> {
    operations: Operations<T, U>,
    config: RwLock<PollerConfig>,
    activation: OnceLock<Activation<T>>,
    context: Arc<Mutex<PollingContext<T>>>,
    poll_gate: Arc<AsyncMutex<()>>,
}

impl<T, U> Shared<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Send + 'static,
{
    /// Build the activation future. It owns what it needs, so it outlives
    /// whichever consumer polls it first.
    fn start_activation(&self) -> Activation<T> {
        let activation = Arc::clone(&self.operations.activation);
        let context = Arc::clone(&self.context);
        async move {
            let snapshot = context.lock().clone();
            debug!("activating long-running operation");

            match activation(snapshot).await {
                Ok(response) => {
                    debug!(
                        status = %response.status(),
                        complete = response.is_complete(),
                        "activation completed"
                    );
                    context.lock().record_activation(response.clone());
                    Ok(response)
                }
                Err(err) => {
                    warn!(error = %err, "activation operation failed");
                    Err(PollerError::operation(Stage::Activation, err))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Latest response when it is terminal
    fn terminal_response(&self) -> Option<PollResponse<T>> {
        self.context
            .lock()
            .latest_response()
            .filter(|r| r.is_complete())
            .cloned()
    }

    async fn invoke_poll(&self, snapshot: PollingContext<T>) -> Result<PollResponse<T>> {
        let attempt = snapshot.poll_count() + 1;
        match (self.operations.poll)(snapshot).await {
            Ok(response) => {
                debug!(
                    attempt,
                    status = %response.status(),
                    retry_after = ?response.retry_after(),
                    "poll completed"
                );
                Ok(response)
            }
            Err(err) => {
                warn!(attempt, error = %err, "poll operation failed");
                Err(PollerError::operation(Stage::Poll, err))
            }
        }
    }

    pub(crate) async fn cancel(&self, snapshot: PollingContext<T>) -> Result<T> {
        let Some(cancel) = &self.operations.cancel else {
            return Err(cancel_unsupported());
        };
        let Some(activation) = snapshot.activation_response().cloned() else {
            return Err(PollerError::unsupported(
                "cancel_operation",
                "the operation has not been activated",
            ));
        };

        debug!(
            latest = ?snapshot.latest_response().map(|r| r.status().to_string()),
            "requesting cancellation"
        );
        cancel(snapshot, activation).await.map_err(|err| {
            warn!(error = %err, "cancel operation failed");
            PollerError::operation(Stage::Cancel, err)
        })
    }

    pub(crate) async fn fetch_result(&self, snapshot: PollingContext<T>) -> Result<U> {
        debug!(polls = snapshot.poll_count(), "fetching final result");
        (self.operations.fetch_result)(snapshot)
            .await
            .map_err(|err| {
                warn!(error = %err, "fetch-result operation failed");
                PollerError::operation(Stage::FetchResult, err)
            })
    }
}

fn cancel_unsupported() -> PollerError {
    PollerError::unsupported(
        "cancel_operation",
        "no cancel callback was supplied for this poller",
    )
}

impl<T, U> Poller<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Send + 'static,
{
    /// Start building a poller
    pub fn builder() -> PollerBuilder<T, U> {
        PollerBuilder::new()
    }

    pub(crate) fn from_parts(
        config: PollerConfig,
        operations: Operations<T, U>,
        context: PollingContext<T>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                operations,
                config: RwLock::new(config),
                activation: OnceLock::new(),
                context: Arc::new(Mutex::new(context)),
                poll_gate: Arc::new(AsyncMutex::new(())),
            }),
        }
    }

    /// Current configuration
    pub fn config(&self) -> PollerConfig {
        self.shared.config.read().clone()
    }

    /// Configured wait between polls
    pub fn poll_interval(&self) -> Duration {
        self.shared.config.read().poll_interval
    }

    /// Change the wait between polls for every subsequent delay.
    ///
    /// A poll already in flight keeps the delay it started with.
    pub fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        validate_poll_interval(interval)?;
        self.shared.config.write().poll_interval = interval;
        debug!(?interval, "poll interval updated");
        Ok(())
    }

    /// Snapshot of the polling context
    pub fn context(&self) -> PollingContext<T> {
        self.shared.context.lock().clone()
    }

    /// Latest recorded response, `None` before activation
    pub fn latest_response(&self) -> Option<PollResponse<T>> {
        self.shared.context.lock().latest_response().cloned()
    }

    /// Latest known status, `None` before activation
    pub fn status(&self) -> Option<OperationStatus> {
        self.shared
            .context
            .lock()
            .latest_response()
            .map(|r| r.status().clone())
    }

    /// Delay before the poll that follows `response`.
    ///
    /// A positive server-suggested delay wins for this one wait; otherwise
    /// the configured interval applies.
    pub fn poll_delay(&self, response: &PollResponse<T>) -> Duration {
        response
            .retry_after()
            .filter(|delay| !delay.is_zero())
            .unwrap_or_else(|| self.poll_interval())
    }

    /// Run the activation callback if no consumer has yet.
    ///
    /// The outcome, success or failure, is cached and replayed to every
    /// later caller. A caller dropped while activation is running does not
    /// restart it; the next caller picks it up where it stopped.
    #[tracing::instrument(skip_all)]
    pub async fn activate(&self) -> Result<PollResponse<T>> {
        let activation = self
            .shared
            .activation
            .get_or_init(|| self.shared.start_activation())
            .clone();
        activation.await
    }

    /// Issue one poll unless the operation is already terminal.
    ///
    /// Activates first when needed. After a terminal status has been
    /// recorded the cached terminal response is returned and the poll
    /// callback is not invoked.
    #[tracing::instrument(skip_all)]
    pub async fn poll_once(&self) -> Result<PollResponse<T>> {
        self.poll_step().await.map(|(response, _)| response)
    }

    pub(crate) async fn poll_step(&self) -> Result<(PollResponse<T>, PollingContext<T>)> {
        self.activate().await?;
        let _gate = self.shared.poll_gate.lock().await;

        let snapshot = self.context();
        if let Some(latest) = snapshot.latest_response().filter(|r| r.is_complete()).cloned() {
            trace!(status = %latest.status(), "operation is terminal, skipping poll");
            return Ok((latest, snapshot));
        }

        let response = self.shared.invoke_poll(snapshot).await?;
        let context = self.record_poll(response.clone());
        Ok((response, context))
    }

    /// Detached poll for the blocking facade: waits `delay`, takes the poll
    /// gate, then calls the poll callback with a fresh snapshot. Nothing is
    /// recorded; a fresh response keeps the gate until [`Poller::commit`],
    /// and dropping an abandoned call releases it.
    pub(crate) fn poll_task(&self, delay: Duration) -> BoxFuture<'static, Result<Polled<T>>> {
        let shared = Arc::clone(&self.shared);
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let gate = Arc::clone(&shared.poll_gate).lock_owned().await;
            if let Some(latest) = shared.terminal_response() {
                return Ok(Polled::Cached(latest));
            }
            let snapshot = shared.context.lock().clone();
            let response = shared.invoke_poll(snapshot).await?;
            Ok(Polled::Fresh(response, gate))
        }
        .boxed()
    }

    /// Record the outcome of [`Poller::poll_task`] and release its gate.
    pub(crate) fn commit(&self, polled: Polled<T>) -> PollResponse<T> {
        match polled {
            Polled::Cached(response) => response,
            Polled::Fresh(response, _gate) => {
                self.record_poll(response.clone());
                response
            }
        }
    }

    fn record_poll(&self, response: PollResponse<T>) -> PollingContext<T> {
        let mut context = self.shared.context.lock();
        context.record_poll(response);
        context.clone()
    }

    /// Poll until a terminal status is observed.
    #[tracing::instrument(skip_all)]
    pub async fn wait_for_completion(&self) -> Result<PollResponse<T>> {
        self.wait_for(|_| false).await
    }

    /// Poll until `status` or a terminal status is observed.
    #[tracing::instrument(skip_all, fields(until = %status))]
    pub async fn wait_until(&self, status: &OperationStatus) -> Result<PollResponse<T>> {
        self.wait_for(|current| current == status).await
    }

    async fn wait_for(&self, reached: impl Fn(&OperationStatus) -> bool) -> Result<PollResponse<T>> {
        let activation = self.activate().await?;
        let mut latest = self.latest_response().unwrap_or(activation);
        loop {
            if latest.is_complete() || reached(latest.status()) {
                return Ok(latest);
            }
            tokio::time::sleep(self.poll_delay(&latest)).await;
            latest = self.poll_once().await?;
        }
    }

    /// Poll to completion, then call the fetch-result callback.
    ///
    /// An already-terminal poller goes straight to fetch-result. The result
    /// is not cached: every call invokes the callback again.
    #[tracing::instrument(skip_all)]
    pub async fn final_result(&self) -> Result<U> {
        self.wait_for_completion().await?;
        self.shared.fetch_result(self.context()).await
    }

    /// Call the cancel callback with the current context and the
    /// activation response.
    ///
    /// This is a one-shot request to the service; it neither stops nor
    /// serializes against polling in progress.
    #[tracing::instrument(skip_all)]
    pub async fn cancel_operation(&self) -> Result<T> {
        if self.shared.operations.cancel.is_none() {
            return Err(cancel_unsupported());
        }
        self.activate().await?;
        self.shared.cancel(self.context()).await
    }
}
