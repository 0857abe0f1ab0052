//! Poll response snapshots

use std::time::Duration;

use crate::status::OperationStatus;

/// Immutable snapshot produced by one activation or poll call.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResponse<T> {
    status: OperationStatus,
    value: Option<T>,
    retry_after: Option<Duration>,
}

impl<T> PollResponse<T> {
    /// Create a response carrying a value
    pub fn new(status: OperationStatus, value: T) -> Self {
        Self {
            status,
            value: Some(value),
            retry_after: None,
        }
    }

    /// Create a response without a value
    pub fn without_value(status: OperationStatus) -> Self {
        Self {
            status,
            value: None,
            retry_after: None,
        }
    }

    /// Attach a server-suggested delay before the next poll.
    ///
    /// The delay replaces the configured poll interval for the single wait
    /// that follows this response.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Status reported by the service
    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    /// Value reported by the service
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consume the response, returning its value
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Server-suggested delay before the next poll
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// Whether the status is terminal
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}
