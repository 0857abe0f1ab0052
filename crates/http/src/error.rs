//! Error types for HTTP polling strategies
use http::StatusCode;
use lro_poller::{BoxError, OperationStatus};
use thiserror::Error;

/// Result type for strategy operations
pub type Result<T> = std::result::Result<T, StrategyError>;

/// Errors raised while driving an operation over HTTP
#[derive(Error, Debug)]
pub enum StrategyError {
    /// A URL or other input could not be used
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong
        message: String,
    },

    /// A header the strategy relies on is absent
    #[error("response is missing the '{header}' header")]
    MissingHeader {
        /// The header name
        header: String,
    },

    /// The service answered with a status the strategy does not accept
    #[error("unexpected HTTP status {status}")]
    UnexpectedStatus {
        /// The response status
        status: StatusCode,
        /// The response body, lossily decoded
        body: String,
    },

    /// A response body could not be decoded
    #[error("failed to decode response body: {message}")]
    Decode {
        /// Decoder message
        message: String,
    },

    /// The pipeline failed to deliver a request
    #[error("transport error: {source}")]
    Transport {
        /// The pipeline's error
        #[source]
        source: BoxError,
    },

    /// The strategy cannot perform the requested step
    #[error("unsupported: {reason}")]
    Unsupported {
        /// Why
        reason: String,
    },

    /// The operation reached a terminal status other than success
    #[error("operation ended with status {status}")]
    OperationFailed {
        /// The terminal status
        status: OperationStatus,
    },
}

impl StrategyError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an unsupported step error
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Wrap a pipeline failure
    pub fn transport(source: BoxError) -> Self {
        Self::Transport { source }
    }

    /// Create an unexpected-status error from a response
    pub fn unexpected_status(response: &http::Response<bytes::Bytes>) -> Self {
        Self::UnexpectedStatus {
            status: response.status(),
            body: String::from_utf8_lossy(response.body()).into_owned(),
        }
    }
}

impl From<serde_json::Error> for StrategyError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}
