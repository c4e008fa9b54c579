use crate::event::EventError;

/// Broad class of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportKind {
    /// DNS failure, refused connection, proxy connect failure. Retryable.
    #[error("connection error")]
    Connection,

    #[error("timeout")]
    Timeout,

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("invalid url")]
    InvalidUrl,

    /// Anything else below the HTTP layer: broken reads, malformed responses.
    #[error("request error")]
    Request,
}

impl TransportKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, TransportKind::Connection)
    }
}

/// A request that never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} for {url} after {attempts} attempt(s): {message}")]
pub struct TransportError {
    pub kind: TransportKind,
    pub url: String,
    pub attempts: u32,
    pub message: String,
}

impl TransportError {
    pub fn new(
        kind: TransportKind,
        url: impl Into<String>,
        attempts: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            url: url.into(),
            attempts,
            message: message.into(),
        }
    }
}

/// Failure of [`HeventsClient::emit`](crate::HeventsClient::emit).
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// The event mapping did not match the schema. Raised before any I/O.
    #[error(transparent)]
    Validation(#[from] EventError),

    /// The requested dispatch mode exists but is not implemented.
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// Only returned when transport errors are not swallowed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Installing the global log subscriber failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to install log subscriber: {0}")]
pub struct LoggingError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_failures_are_retryable() {
        assert!(TransportKind::Connection.is_retryable());
        assert!(!TransportKind::Timeout.is_retryable());
        assert!(!TransportKind::TooManyRedirects.is_retryable());
        assert!(!TransportKind::InvalidUrl.is_retryable());
        assert!(!TransportKind::Request.is_retryable());
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::new(
            TransportKind::Connection,
            "http://h/api/events",
            6,
            "Connection refused",
        );
        assert_eq!(
            err.to_string(),
            "connection error for http://h/api/events after 6 attempt(s): Connection refused"
        );
    }

    #[test]
    fn validation_error_is_transparent() {
        let err: EmitError = EventError::MissingField { field: "event" }.into();
        assert_eq!(err.to_string(), "Required argument `event` is missing");
    }
}
