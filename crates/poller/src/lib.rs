//! # LRO Poller
//!
//! Drives a server-side long-running operation to completion through four
//! caller-supplied callbacks: activation, poll, cancel and fetch-result.
//!
//! Two consumption models share one state machine:
//!
//! - **[`Poller`]**: async. Await [`Poller::wait_for_completion`] or
//!   subscribe with [`Poller::stream`] to see every observed status.
//! - **[`SyncPoller`]**: blocking, with per-poll and overall timeouts.
//!
//! Activation runs at most once per poller. Once a terminal status is
//! observed no further polls are issued. A positive `retry_after` on a
//! response replaces the configured interval for the next wait only.
//!
//! ## Quick Start
//!
//! ```rust
//! use lro_poller::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PollerError> {
//!     let poller = Poller::builder()
//!         .poll_interval(Duration::from_millis(10))
//!         .activation(|_ctx| async {
//!             Ok::<_, BoxError>(PollResponse::new(OperationStatus::NOT_STARTED, 0_u32))
//!         })
//!         .poll_operation(|ctx: PollingContext<u32>| async move {
//!             let step = ctx.poll_count() as u32 + 1;
//!             let status = if step < 3 {
//!                 OperationStatus::IN_PROGRESS
//!             } else {
//!                 OperationStatus::SUCCESSFULLY_COMPLETED
//!             };
//!             Ok::<_, BoxError>(PollResponse::new(status, step))
//!         })
//!         .cancel_unsupported()
//!         .fetch_result(|_ctx| async { Ok::<_, BoxError>("done") })
//!         .build()?;
//!
//!     assert_eq!(poller.final_result().await?, "done");
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]

mod builder;
mod config;
mod context;
mod error;
mod operation;
mod poller;
mod response;
mod status;
mod stream;
mod sync_poller;

pub use builder::PollerBuilder;
pub use config::{
    ActivationMode, DEFAULT_POLL_INTERVAL, ENV_ACTIVATION, ENV_OVERALL_TIMEOUT, ENV_POLL_INTERVAL,
    ENV_POLL_TIMEOUT, PollerConfig, WaitOptions,
};
pub use context::PollingContext;
pub use error::{BoxError, PollerError, Result, Stage, TimeoutKind};
pub use poller::Poller;
pub use response::PollResponse;
pub use status::OperationStatus;
pub use stream::{AsyncPollResponse, PollStream};
pub use sync_poller::SyncPoller;

/// Prelude with the types needed to build and drive a poller.
pub mod prelude {
    pub use crate::{
        AsyncPollResponse, BoxError, OperationStatus, PollResponse, Poller, PollerBuilder,
        PollerConfig, PollerError, PollingContext, SyncPoller, WaitOptions,
    };
}
