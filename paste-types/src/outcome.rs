//! Cross-layer results for pastebin-sync.
//!
//! Every store, remote and repository operation returns an [`Outcome`]
//! instead of a bare `Result`, so callers can tell a local fault from a
//! fault reported by the remote service without inspecting error chains.

use std::fmt;
use thiserror::Error;

/// HTTP statuses that are worth retrying later.
pub const RECOVERABLE_STATUS_CODES: [u16; 7] = [408, 425, 429, 500, 502, 503, 504];

/// The underlying cause of a client-side failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientFault {
    /// No session is stored.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    /// Caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Local storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected format.
    #[error("decode error: {0}")]
    Decode(String),

    /// Unexpected fault caught at a repository boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A failed [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Fault on this side of the wire.
    ClientError {
        /// What went wrong.
        fault: ClientFault,
        /// Optional human-readable context.
        message: Option<String>,
    },
    /// Fault reported by the remote service.
    RemoteError {
        /// HTTP (or envelope) status code.
        status_code: u16,
        /// Message supplied by the server.
        message: String,
    },
}

impl Failure {
    /// Build a client error without extra context.
    pub fn client(fault: ClientFault) -> Self {
        Failure::ClientError {
            fault,
            message: None,
        }
    }

    /// Build a remote error.
    pub fn remote(status_code: u16, message: impl Into<String>) -> Self {
        Failure::RemoteError {
            status_code,
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    ///
    /// Client errors are always retryable; remote errors only for
    /// [`RECOVERABLE_STATUS_CODES`].
    pub fn is_recoverable(&self) -> bool {
        match self {
            Failure::ClientError { .. } => true,
            Failure::RemoteError { status_code, .. } => {
                RECOVERABLE_STATUS_CODES.contains(status_code)
            }
        }
    }

    /// The user-facing message of this failure.
    pub fn message(&self) -> String {
        match self {
            Failure::ClientError {
                message: Some(message),
                ..
            } => message.clone(),
            Failure::ClientError { fault, .. } => fault.to_string(),
            Failure::RemoteError { message, .. } => message.clone(),
        }
    }

    /// Re-type as a failed [`Outcome`] of another payload, transforming the
    /// message on the way.
    ///
    /// Client errors keep their fault; the transformed message becomes their
    /// context.
    pub fn map_failure<R>(self, transform: impl FnOnce(String) -> String) -> Outcome<R> {
        Outcome::Failure(self.map_message(transform))
    }

    /// Re-type as a failed [`Outcome`] of another payload, unchanged.
    pub fn cast_failure<R>(self) -> Outcome<R> {
        Outcome::Failure(self)
    }

    fn map_message(self, transform: impl FnOnce(String) -> String) -> Self {
        match self {
            Failure::ClientError { fault, message } => {
                let old = message.unwrap_or_else(|| fault.to_string());
                Failure::ClientError {
                    fault,
                    message: Some(transform(old)),
                }
            }
            Failure::RemoteError {
                status_code,
                message,
            } => Failure::RemoteError {
                status_code,
                message: transform(message),
            },
        }
    }

    /// Emit this failure to the log with some context.
    pub fn log(&self, context: &str) {
        match self {
            Failure::ClientError { fault, message } => match message {
                Some(message) => tracing::error!("{}: {} ({})", context, message, fault),
                None => tracing::error!("{}: {}", context, fault),
            },
            Failure::RemoteError {
                status_code,
                message,
            } => tracing::error!("{}: {} - {}", context, status_code, message),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::ClientError {
                fault,
                message: Some(message),
            } => write!(f, "{} ({})", message, fault),
            Failure::ClientError {
                fault,
                message: None,
            } => write!(f, "{}", fault),
            Failure::RemoteError {
                status_code,
                message,
            } => write!(f, "remote error {}: {}", status_code, message),
        }
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Failure::ClientError { fault, .. } => Some(fault),
            Failure::RemoteError { .. } => None,
        }
    }
}

impl From<ClientFault> for Failure {
    fn from(fault: ClientFault) -> Self {
        Failure::client(fault)
    }
}

/// Result of an operation: a payload or a [`Failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation succeeded.
    Success(T),
    /// The operation failed.
    Failure(Failure),
}

impl<T> Outcome<T> {
    /// Shorthand for a client error without extra context.
    pub fn client_error(fault: ClientFault) -> Self {
        Outcome::Failure(Failure::client(fault))
    }

    /// Shorthand for a remote error.
    pub fn remote_error(status_code: u16, message: impl Into<String>) -> Self {
        Outcome::Failure(Failure::remote(status_code, message))
    }

    /// Whether this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Whether this is a client error.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Outcome::Failure(Failure::ClientError { .. }))
    }

    /// Whether this is a remote error.
    pub fn is_remote_error(&self) -> bool {
        matches!(self, Outcome::Failure(Failure::RemoteError { .. }))
    }

    /// Take the payload, discarding a failure.
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Failure(_) => None,
        }
    }

    /// Borrow the failure, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    /// Transform the payload; failures pass through unchanged.
    pub fn map<R>(self, transform: impl FnOnce(T) -> R) -> Outcome<R> {
        match self {
            Outcome::Success(data) => Outcome::Success(transform(data)),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    /// Log the failure with some context; no-op on success.
    pub fn log_if_failure(&self, context: &str) {
        if let Outcome::Failure(failure) = self {
            failure.log(context);
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Outcome::Success(data) => Ok(data),
            Outcome::Failure(failure) => Err(failure),
        }
    }
}

impl<T> From<Failure> for Outcome<T> {
    fn from(failure: Failure) -> Self {
        Outcome::Failure(failure)
    }
}

impl<T> From<Result<T, Failure>> for Outcome<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(data) => Outcome::Success(data),
            Err(failure) => Outcome::Failure(failure),
        }
    }
}
