/// Boxed error carried as the cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Failure surfaced by the wrapped transfer handler. Retried or
    /// returned as-is, per the retry decider's verdict.
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable failure description from the handler.
        message: String,
        /// Underlying cause, when the handler had one to attach.
        #[source]
        source: Option<BoxError>,
    },
    /// The abort signal was set before an attempt started, or fired while
    /// a backoff delay was pending.
    #[error("Request aborted.")]
    Aborted,
    /// Retry options failed validation before the first attempt.
    #[error("invalid retry configuration: {0}")]
    Configuration(String),
}

impl TransferError {
    /// Creates a transport error from a message alone.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error preserving the underlying cause.
    pub fn transport_with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns true for the cancellation error raised by the retry layer.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::TransferError;

    #[test]
    fn aborted_error_has_fixed_message() {
        assert_eq!(TransferError::Aborted.to_string(), "Request aborted.");
    }

    #[test]
    fn transport_error_keeps_handler_message() {
        let err = TransferError::transport("connection reset by peer");
        assert_eq!(
            err.to_string(),
            "transport error: connection reset by peer"
        );
        assert!(!err.is_aborted());
    }

    #[test]
    fn transport_error_exposes_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let err = TransferError::transport_with_source("request timed out", cause);
        let source = std::error::Error::source(&err).expect("source must be attached");
        assert_eq!(source.to_string(), "read timed out");
    }
}
