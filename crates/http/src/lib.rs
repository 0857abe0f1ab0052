//! # LRO HTTP
//!
//! Completion-detection strategies that drive an HTTP long-running
//! operation through the `lro-poller` engine.
//!
//! - [`OperationResourceStrategy`]: a separate status resource named by
//!   `Operation-Location` or `Azure-AsyncOperation`
//! - [`LocationStrategy`]: polling the `Location` header until `200`
//! - [`StatusCheckStrategy`]: operations that finish with the initial
//!   response
//! - [`ChainedStrategy`]: the first of several that accepts the operation
//!
//! [`HttpOperation`] turns any strategy into a [`lro_poller::PollerBuilder`].
//! Requests go through an [`HttpPipeline`] supplied by the caller.

#![deny(unsafe_code)]

mod error;
mod operation;
mod pipeline;
mod resolve;
mod retry_after;
mod status;
pub mod strategy;

pub use error::{Result, StrategyError};
pub use operation::{HttpOperation, InitialRequest};
pub use pipeline::{HttpPipeline, HttpRequest, HttpResponse};
pub use resolve::resolve_url;
pub use retry_after::{retry_after, retry_after_at};
pub use status::service_status;
pub use strategy::{
    ChainedStrategy, LocationStrategy, LroState, OperationResourceStrategy, PollingStrategy,
    StatusCheckStrategy,
};
