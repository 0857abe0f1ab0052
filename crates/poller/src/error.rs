//! Error types for the poller engine

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::status::OperationStatus;

/// Error type returned by operation callbacks.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Result type for poller operations
pub type Result<T> = std::result::Result<T, PollerError>;

/// Callback slot an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The activation callback.
    Activation,
    /// The poll callback.
    Poll,
    /// The cancel callback.
    Cancel,
    /// The fetch-result callback.
    FetchResult,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activation => write!(f, "activation"),
            Self::Poll => write!(f, "poll"),
            Self::Cancel => write!(f, "cancel"),
            Self::FetchResult => write!(f, "fetch-result"),
        }
    }
}

/// Which bound of a blocking wait fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// A single poll (including the wait before it) exceeded the per-poll bound.
    PerPoll,
    /// The remaining budget of the overall wait ran out.
    Overall,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerPoll => write!(f, "poll"),
            Self::Overall => write!(f, "overall wait"),
        }
    }
}

/// Errors raised by the poller engine and its facades.
///
/// Callback failures are carried unchanged inside [`PollerError::Operation`];
/// the engine itself only adds configuration, timeout and unsupported-operation
/// errors at its own boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PollerError {
    /// A configuration value or argument is invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },

    /// A required callback was not supplied.
    #[error("'{argument}' cannot be null")]
    MissingCallback {
        /// Name of the missing argument.
        argument: &'static str,
    },

    /// The requested operation is not available for this poller.
    #[error("{operation} is not supported: {reason}")]
    UnsupportedOperation {
        /// The rejected operation.
        operation: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A final result was requested before a terminal status was observed.
    #[error("operation has not completed; latest status is {status}")]
    NotComplete {
        /// Latest observed status.
        status: OperationStatus,
    },

    /// A time-bounded wait of the blocking facade elapsed.
    #[error("{kind} timed out after {duration:?}")]
    Timeout {
        /// Which bound fired.
        kind: TimeoutKind,
        /// The bound that elapsed.
        duration: Duration,
        /// The triggering cause, when one is known.
        #[source]
        source: Option<Arc<dyn StdError + Send + Sync>>,
    },

    /// A callback failed. The original error is kept as the source.
    #[error("{stage} operation failed: {source}")]
    Operation {
        /// Callback slot that failed.
        stage: Stage,
        /// The error returned by the callback.
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// The blocking facade's runtime could not run a task.
    #[error("poller runtime failure: {message}")]
    Runtime {
        /// Failure details.
        message: String,
    },
}

impl PollerError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation,
            reason: reason.into(),
        }
    }

    /// Wrap a callback error
    pub fn operation(stage: Stage, source: BoxError) -> Self {
        Self::Operation {
            stage,
            source: Arc::from(source),
        }
    }

    /// Create a timeout error
    pub fn timeout(
        kind: TimeoutKind,
        duration: Duration,
        source: Option<Arc<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Timeout {
            kind,
            duration,
            source,
        }
    }

    /// Check if this error is a timeout raised by the blocking facade
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Which bound fired, for timeout errors
    #[must_use]
    pub fn timeout_kind(&self) -> Option<TimeoutKind> {
        match self {
            Self::Timeout { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check if this error was raised while validating configuration
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. } | Self::MissingCallback { .. }
        )
    }

    /// The error a callback returned, if this error came from one.
    ///
    /// Downcast it to recover the caller's own error type.
    #[must_use]
    pub fn operation_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::Operation { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
