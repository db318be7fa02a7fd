//! Error types for router clients and operations

use thiserror::Error;

/// Result type for router-client calls
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type for dispatched operations
pub type OperationResult<T> = Result<T, OperationError>;

/// Errors raised by a router client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Credentials were rejected by the device
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The device could not be reached or the session dropped
    #[error("Network error: {0}")]
    Network(String),

    /// The device rejected or failed a fetch/apply
    #[error("{0}")]
    Device(String),

    /// The device did not answer in time
    #[error("Request timed out")]
    Timeout,

    /// Data kind or action not available on this device
    #[error("Not supported: {0}")]
    NotSupported(String),
}

/// Errors produced by the operation dispatcher.
///
/// Every variant except [`OperationError::Validation`] carries the operation's
/// error context (e.g. `"Error rebooting router"`) so the rendered message
/// reads `"<context>: <cause>"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Bad or missing parameter. Raised before any session is acquired.
    #[error("{0}")]
    Validation(String),

    /// The request is well formed but this router cannot honour it
    #[error("{context}: {message}")]
    Unsupported {
        context: &'static str,
        message: String,
    },

    /// Session acquisition (authentication or network negotiation) failed
    #[error("{context}: {message}")]
    Connection {
        context: &'static str,
        message: String,
    },

    /// The router client failed during fetch/apply
    #[error("{context}: {message}")]
    Device {
        context: &'static str,
        message: String,
    },

    /// The operation deadline expired
    #[error("{context}: {message}")]
    Timeout {
        context: &'static str,
        message: String,
    },
}

impl OperationError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            OperationError::Validation(_) => "validation",
            OperationError::Unsupported { .. } => "unsupported",
            OperationError::Connection { .. } => "connection",
            OperationError::Device { .. } => "device",
            OperationError::Timeout { .. } => "timeout",
        }
    }

    /// Map a client error raised during a fetch/apply
    pub fn from_call(context: &'static str, err: ClientError) -> Self {
        match err {
            ClientError::Timeout => OperationError::Timeout {
                context,
                message: err.to_string(),
            },
            ClientError::Authentication(_) => OperationError::Connection {
                context,
                message: err.to_string(),
            },
            ClientError::NotSupported(_) => OperationError::Unsupported {
                context,
                message: err.to_string(),
            },
            other => OperationError::Device {
                context,
                message: other.to_string(),
            },
        }
    }

    /// Map a client error raised while acquiring a session
    pub fn from_acquire(context: &'static str, err: ClientError) -> Self {
        match err {
            ClientError::Timeout => OperationError::Timeout {
                context,
                message: err.to_string(),
            },
            other => OperationError::Connection {
                context,
                message: other.to_string(),
            },
        }
    }
}
