//! Boundary to the HTTP stack.

use async_trait::async_trait;
use bytes::Bytes;
use lro_poller::BoxError;

/// Request type sent through a pipeline
pub type HttpRequest = http::Request<Bytes>;

/// Response type returned by a pipeline
pub type HttpResponse = http::Response<Bytes>;

/// Sends requests on behalf of a strategy.
///
/// Authentication, retries and transport are the implementor's concern.
/// Any status code is a successful send; only a failure to obtain a
/// response is an error.
#[async_trait]
pub trait HttpPipeline: Send + Sync {
    /// Send one request and buffer the response body
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError>;
}
