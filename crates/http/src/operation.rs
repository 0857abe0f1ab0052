//! Wiring a strategy into the four poller callbacks.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method, Request};
use lro_poller::{BoxError, OperationStatus, PollResponse, PollerBuilder, PollingContext};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Result, StrategyError};
use crate::pipeline::{HttpPipeline, HttpRequest};
use crate::strategy::{ChainedStrategy, LroState, PollingStrategy};

/// The request that starts an operation.
///
/// Kept as plain parts so it can be rebuilt for every send.
#[derive(Debug, Clone)]
pub struct InitialRequest {
    /// Request method
    pub method: Method,
    /// Request URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl InitialRequest {
    /// Create a request without headers or body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a raw body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type
    pub fn with_json(mut self, body: &impl Serialize) -> Result<Self> {
        self.body = Bytes::from(serde_json::to_vec(body)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    fn to_request(&self) -> Result<HttpRequest> {
        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str())
            .body(self.body.clone())
            .map_err(|e| StrategyError::invalid_argument(format!("invalid initial request: {e}")))?;
        request.headers_mut().extend(self.headers.clone());
        Ok(request)
    }
}

/// A long-running operation started by one HTTP request.
///
/// ```rust,ignore
/// let poller = HttpOperation::new(pipeline, InitialRequest::new(Method::PUT, url))
///     .with_endpoint(endpoint)
///     .into_poller_builder()
///     .poll_interval(Duration::from_secs(2))
///     .build_sync()?;
/// let certificate = poller.final_result()?;
/// ```
pub struct HttpOperation {
    pipeline: Arc<dyn HttpPipeline>,
    request: InitialRequest,
    strategy: Arc<dyn PollingStrategy>,
    endpoint: Option<Url>,
}

impl std::fmt::Debug for HttpOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOperation")
            .field("request", &self.request)
            .field("strategy", &self.strategy.name())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpOperation {
    /// Operation started by `request`, polled with [`ChainedStrategy::default`]
    pub fn new(pipeline: Arc<dyn HttpPipeline>, request: InitialRequest) -> Self {
        Self {
            pipeline,
            request,
            strategy: Arc::new(ChainedStrategy::default()),
            endpoint: None,
        }
    }

    /// Use `strategy` instead of the default chain
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl PollingStrategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    /// Base for relative URLs returned by the service
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Poller builder whose callbacks send the initial request, poll through
    /// the strategy and fetch its final result. Cancellation is unsupported.
    ///
    /// The method and URL of the initial request are available to every
    /// callback as context data under `lro.method` and `lro.url`.
    pub fn into_poller_builder(self) -> PollerBuilder<Value, Value> {
        let method = self.request.method.to_string();
        let url = self.request.url.to_string();

        let mut state = LroState::new(self.request.method.clone(), self.request.url.clone());
        state.endpoint = self.endpoint;
        let driver = Arc::new(Driver {
            pipeline: self.pipeline,
            request: self.request,
            strategy: self.strategy,
            state: Mutex::new(state),
        });

        let activate = Arc::clone(&driver);
        let poll = Arc::clone(&driver);
        let fetch = driver;
        PollerBuilder::new()
            .context_data("lro.method", method)
            .context_data("lro.url", url)
            .activation(move |_ctx| {
                let driver = Arc::clone(&activate);
                async move { driver.activate().await.map_err(BoxError::from) }
            })
            .poll_operation(move |_ctx| {
                let driver = Arc::clone(&poll);
                async move { driver.poll().await.map_err(BoxError::from) }
            })
            .cancel_unsupported()
            .fetch_result(move |ctx| {
                let driver = Arc::clone(&fetch);
                async move { driver.fetch(ctx).await.map_err(BoxError::from) }
            })
    }
}

/// Strategy state shared by the callbacks. Each call works on a copy and
/// writes it back once the strategy step succeeded.
struct Driver {
    pipeline: Arc<dyn HttpPipeline>,
    request: InitialRequest,
    strategy: Arc<dyn PollingStrategy>,
    state: Mutex<LroState>,
}

impl Driver {
    #[instrument(skip_all, fields(method = %self.request.method, url = %self.request.url))]
    async fn activate(&self) -> Result<PollResponse<Value>> {
        let request = self.request.to_request()?;
        let response = self
            .pipeline
            .send(request)
            .await
            .map_err(StrategyError::transport)?;
        debug!(status = %response.status(), "initial response received");

        if !self.strategy.can_poll(&response) {
            return Err(StrategyError::unsupported(format!(
                "strategy '{}' cannot poll a {} response",
                self.strategy.name(),
                response.status()
            )));
        }
        let mut state = self.state.lock().clone();
        let first = self.strategy.on_initial_response(&response, &mut state)?;
        *self.state.lock() = state;
        Ok(first)
    }

    async fn poll(&self) -> Result<PollResponse<Value>> {
        let mut state = self.state.lock().clone();
        let response = self.strategy.poll(self.pipeline.as_ref(), &mut state).await?;
        *self.state.lock() = state;
        Ok(response)
    }

    async fn fetch(&self, ctx: PollingContext<Value>) -> Result<Value> {
        if let Some(status) = ctx.latest_response().map(PollResponse::status)
            && (*status == OperationStatus::FAILED || *status == OperationStatus::USER_CANCELLED)
        {
            return Err(StrategyError::OperationFailed {
                status: status.clone(),
            });
        }
        let state = self.state.lock().clone();
        self.strategy
            .final_result(self.pipeline.as_ref(), &state)
            .await
    }
}
