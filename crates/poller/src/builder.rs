//! Builder collecting configuration and the four operation callbacks.

use std::future::Future;
use std::time::Duration;

use indexmap::IndexMap;

use crate::config::PollerConfig;
use crate::context::PollingContext;
use crate::error::{BoxError, PollerError, Result};
use crate::operation::{
    CancelSlot, FetchFn, Operations, PollFn, async_fn, blocking_cancel_fn, blocking_fn, cancel_fn,
};
use crate::poller::Poller;
use crate::response::PollResponse;
use crate::sync_poller::SyncPoller;

/// Builder for [`Poller`] and [`SyncPoller`].
///
/// Every callback has an async flavour and a `_blocking` flavour; blocking
/// callbacks run on the runtime's blocking pool.
///
/// ```rust,ignore
/// let poller = Poller::builder()
///     .poll_interval(Duration::from_millis(500))
///     .activation(|_ctx| async { Ok(PollResponse::new(OperationStatus::NOT_STARTED, id)) })
///     .poll_operation(|ctx| async move { service.status(&ctx).await })
///     .cancel_unsupported()
///     .fetch_result(|ctx| async move { service.result(&ctx).await })
///     .build()?;
/// ```
pub struct PollerBuilder<T, U> {
    config: PollerConfig,
    activation: Option<PollFn<T>>,
    poll: Option<PollFn<T>>,
    cancel: CancelSlot<T>,
    fetch_result: Option<FetchFn<T, U>>,
    data: IndexMap<String, String>,
}

impl<T, U> Default for PollerBuilder<T, U> {
    fn default() -> Self {
        Self {
            config: PollerConfig::default(),
            activation: None,
            poll: None,
            cancel: CancelSlot::Unset,
            fetch_result: None,
            data: IndexMap::new(),
        }
    }
}

impl<T, U> PollerBuilder<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Send + 'static,
{
    /// Create an empty builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    #[must_use]
    pub fn config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the wait between polls
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Add a caller-supplied entry visible to every callback
    #[must_use]
    pub fn context_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Async callback that starts the operation
    #[must_use]
    pub fn activation<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PollingContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<PollResponse<T>, BoxError>> + Send + 'static,
    {
        self.activation = Some(async_fn(f));
        self
    }

    /// Blocking callback that starts the operation
    #[must_use]
    pub fn activation_blocking<F>(mut self, f: F) -> Self
    where
        F: Fn(PollingContext<T>) -> std::result::Result<PollResponse<T>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.activation = Some(blocking_fn(f));
        self
    }

    /// Async callback that checks the operation's status once
    #[must_use]
    pub fn poll_operation<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PollingContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<PollResponse<T>, BoxError>> + Send + 'static,
    {
        self.poll = Some(async_fn(f));
        self
    }

    /// Blocking callback that checks the operation's status once
    #[must_use]
    pub fn poll_operation_blocking<F>(mut self, f: F) -> Self
    where
        F: Fn(PollingContext<T>) -> std::result::Result<PollResponse<T>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.poll = Some(blocking_fn(f));
        self
    }

    /// Async callback that asks the service to cancel.
    ///
    /// The second argument is the activation response.
    #[must_use]
    pub fn cancel_operation<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PollingContext<T>, PollResponse<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, BoxError>> + Send + 'static,
    {
        self.cancel = CancelSlot::Callback(cancel_fn(f));
        self
    }

    /// Blocking callback that asks the service to cancel
    #[must_use]
    pub fn cancel_operation_blocking<F>(mut self, f: F) -> Self
    where
        F: Fn(PollingContext<T>, PollResponse<T>) -> std::result::Result<T, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.cancel = CancelSlot::Callback(blocking_cancel_fn(f));
        self
    }

    /// Declare that the service cannot cancel this operation.
    ///
    /// `cancel_operation` on the built poller then fails with
    /// [`PollerError::UnsupportedOperation`].
    #[must_use]
    pub fn cancel_unsupported(mut self) -> Self {
        self.cancel = CancelSlot::Unsupported;
        self
    }

    /// Async callback that retrieves the final result
    #[must_use]
    pub fn fetch_result<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(PollingContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<U, BoxError>> + Send + 'static,
    {
        self.fetch_result = Some(async_fn(f));
        self
    }

    /// Blocking callback that retrieves the final result
    #[must_use]
    pub fn fetch_result_blocking<F>(mut self, f: F) -> Self
    where
        F: Fn(PollingContext<T>) -> std::result::Result<U, BoxError> + Send + Sync + 'static,
    {
        self.fetch_result = Some(blocking_fn(f));
        self
    }

    /// Validate and build the async poller.
    ///
    /// Configuration is checked first, then the callbacks in the order
    /// activation, poll, cancel, fetch-result.
    pub fn build(self) -> Result<Poller<T, U>> {
        self.config.validate()?;

        let activation = self.activation.ok_or(PollerError::MissingCallback {
            argument: "activation_operation",
        })?;
        let poll = self.poll.ok_or(PollerError::MissingCallback {
            argument: "poll_operation",
        })?;
        let cancel = match self.cancel {
            CancelSlot::Unset => {
                return Err(PollerError::MissingCallback {
                    argument: "cancel_operation",
                });
            }
            CancelSlot::Unsupported => None,
            CancelSlot::Callback(f) => Some(f),
        };
        let fetch_result = self.fetch_result.ok_or(PollerError::MissingCallback {
            argument: "fetch_result_operation",
        })?;

        Ok(Poller::from_parts(
            self.config,
            Operations {
                activation,
                poll,
                cancel,
                fetch_result,
            },
            PollingContext::with_data(self.data),
        ))
    }

    /// Validate and build the blocking facade.
    ///
    /// With [`ActivationMode::Eager`](crate::ActivationMode::Eager) the
    /// activation callback runs before this returns.
    pub fn build_sync(self) -> Result<SyncPoller<T, U>> {
        SyncPoller::new(self.build()?)
    }
}
