//! Reactive view of a poller.
//!
//! [`Poller::stream`] yields one [`AsyncPollResponse`] per observed status.
//! Every subscription shares the poller's activation latch, so activation
//! runs once no matter how many streams are opened.

use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tracing::trace;

use crate::context::PollingContext;
use crate::error::{PollerError, Result};
use crate::poller::Poller;
use crate::response::PollResponse;
use crate::status::OperationStatus;

/// Stream of poll observations.
pub type PollStream<T, U> = BoxStream<'static, Result<AsyncPollResponse<T, U>>>;

/// One element of a poller stream: the observed response together with the
/// context as it stood when the response was recorded.
pub struct AsyncPollResponse<T, U> {
    response: PollResponse<T>,
    context: PollingContext<T>,
    poller: Poller<T, U>,
}

impl<T: fmt::Debug, U> fmt::Debug for AsyncPollResponse<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPollResponse")
            .field("response", &self.response)
            .field("polls", &self.context.poll_count())
            .finish_non_exhaustive()
    }
}

impl<T, U> AsyncPollResponse<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Send + 'static,
{
    fn new(response: PollResponse<T>, context: PollingContext<T>, poller: Poller<T, U>) -> Self {
        Self {
            response,
            context,
            poller,
        }
    }

    /// Observed status
    pub fn status(&self) -> &OperationStatus {
        self.response.status()
    }

    /// Observed value
    pub fn value(&self) -> Option<&T> {
        self.response.value()
    }

    /// Server-suggested delay carried by this observation
    pub fn retry_after(&self) -> Option<Duration> {
        self.response.retry_after()
    }

    /// Observed response
    pub fn response(&self) -> &PollResponse<T> {
        &self.response
    }

    /// Consume the element, returning its response
    pub fn into_response(self) -> PollResponse<T> {
        self.response
    }

    /// Context snapshot taken when this response was recorded
    pub fn context(&self) -> &PollingContext<T> {
        &self.context
    }

    /// Ask the service to cancel, using this element's context.
    ///
    /// The cancel callback receives the activation response and a context
    /// whose latest response is this element's response.
    pub async fn cancel_operation(&self) -> Result<T> {
        self.poller.shared.cancel(self.context.clone()).await
    }

    /// Fetch the final result, using this element's context.
    ///
    /// Fails with [`PollerError::NotComplete`] unless this element carries a
    /// terminal status.
    pub async fn final_result(&self) -> Result<U> {
        if !self.response.is_complete() {
            return Err(PollerError::NotComplete {
                status: self.response.status().clone(),
            });
        }
        self.poller.shared.fetch_result(self.context.clone()).await
    }
}

enum Step {
    Activate,
    Poll,
    Done,
}

impl<T, U> Poller<T, U>
where
    T: Clone + Send + Sync + 'static,
    U: Send + 'static,
{
    /// Subscribe to the poller.
    ///
    /// Activation happens on first subscription. The activation response is
    /// emitted only when it is already terminal; otherwise each element is
    /// one poll, made after waiting [`Poller::poll_delay`]. The stream ends
    /// after the first terminal element or the first error. Dropping the
    /// stream stops polling for this subscriber.
    pub fn stream(&self) -> PollStream<T, U> {
        let poller = self.clone();
        stream::try_unfold(Step::Activate, move |step| {
            let poller = poller.clone();
            async move { poller.advance(step).await }
        })
        .boxed()
    }

    async fn advance(&self, step: Step) -> Result<Option<(AsyncPollResponse<T, U>, Step)>> {
        match step {
            Step::Done => return Ok(None),
            Step::Activate => {
                self.activate().await?;
            }
            Step::Poll => {}
        }

        let snapshot = self.context();
        let Some(latest) = snapshot.latest_response().cloned() else {
            return Ok(None);
        };
        if latest.is_complete() {
            trace!(status = %latest.status(), "emitting terminal response");
            let element = AsyncPollResponse::new(latest, snapshot, self.clone());
            return Ok(Some((element, Step::Done)));
        }

        tokio::time::sleep(self.poll_delay(&latest)).await;
        let (response, context) = self.poll_step().await?;
        let next = if response.is_complete() {
            Step::Done
        } else {
            Step::Poll
        };
        Ok(Some((AsyncPollResponse::new(response, context, self.clone()), next)))
    }
}
