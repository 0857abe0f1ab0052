//! The four callback slots through which domain logic enters the engine.
//!
//! Every slot is stored as a shared, type-erased async function taking an
//! owned [`PollingContext`] snapshot. Blocking callbacks are adapted onto
//! the runtime's blocking pool so they never stall an async consumer.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::context::PollingContext;
use crate::error::BoxError;
use crate::response::PollResponse;

/// Activation and poll callbacks: context snapshot in, status snapshot out.
pub(crate) type PollFn<T> = Arc<
    dyn Fn(PollingContext<T>) -> BoxFuture<'static, Result<PollResponse<T>, BoxError>>
        + Send
        + Sync,
>;

/// Cancel callback: context snapshot and activation response in.
pub(crate) type CancelFn<T> = Arc<
    dyn Fn(PollingContext<T>, PollResponse<T>) -> BoxFuture<'static, Result<T, BoxError>>
        + Send
        + Sync,
>;

/// Fetch-result callback.
pub(crate) type FetchFn<T, U> =
    Arc<dyn Fn(PollingContext<T>) -> BoxFuture<'static, Result<U, BoxError>> + Send + Sync>;

/// Cancel slot as collected by the builder.
pub(crate) enum CancelSlot<T> {
    /// Nothing was configured; building fails.
    Unset,
    /// Explicitly declared unsupported; `cancel_operation` fails.
    Unsupported,
    /// A cancel callback.
    Callback(CancelFn<T>),
}

/// Validated callback set owned by one poller.
pub(crate) struct Operations<T, U> {
    pub(crate) activation: PollFn<T>,
    pub(crate) poll: PollFn<T>,
    pub(crate) cancel: Option<CancelFn<T>>,
    pub(crate) fetch_result: FetchFn<T, U>,
}

pub(crate) fn async_fn<A, R, F, Fut>(
    f: F,
) -> Arc<dyn Fn(A) -> BoxFuture<'static, Result<R, BoxError>> + Send + Sync>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    A: 'static,
    R: 'static,
{
    Arc::new(move |arg: A| -> BoxFuture<'static, Result<R, BoxError>> { f(arg).boxed() })
}

pub(crate) fn blocking_fn<A, R, F>(
    f: F,
) -> Arc<dyn Fn(A) -> BoxFuture<'static, Result<R, BoxError>> + Send + Sync>
where
    F: Fn(A) -> Result<R, BoxError> + Send + Sync + 'static,
    A: Send + 'static,
    R: Send + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |arg: A| -> BoxFuture<'static, Result<R, BoxError>> {
        let f = Arc::clone(&f);
        async move {
            match tokio::task::spawn_blocking(move || f(arg)).await {
                Ok(result) => result,
                Err(join) => Err(join.into()),
            }
        }
        .boxed()
    })
}

pub(crate) fn cancel_fn<T, F, Fut>(f: F) -> CancelFn<T>
where
    T: 'static,
    F: Fn(PollingContext<T>, PollResponse<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
{
    Arc::new(
        move |ctx: PollingContext<T>,
              activation: PollResponse<T>|
              -> BoxFuture<'static, Result<T, BoxError>> { f(ctx, activation).boxed() },
    )
}

pub(crate) fn blocking_cancel_fn<T, F>(f: F) -> CancelFn<T>
where
    T: Send + 'static,
    F: Fn(PollingContext<T>, PollResponse<T>) -> Result<T, BoxError> + Send + Sync + 'static,
{
    let inner = blocking_fn(
        move |(ctx, activation): (PollingContext<T>, PollResponse<T>)| f(ctx, activation),
    );
    Arc::new(
        move |ctx: PollingContext<T>,
              activation: PollResponse<T>|
              -> BoxFuture<'static, Result<T, BoxError>> { inner((ctx, activation)) },
    )
}
