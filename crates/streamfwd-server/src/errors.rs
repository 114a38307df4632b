//! Forwarder error types.

use thiserror::Error;

/// Boxed error from an external collaborator (transport, key function).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that end a forwarded stream.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// A message could not be serialized or projected.
    #[error("failed to marshal message: {0}")]
    Marshal(#[from] serde_json::Error),

    /// The upstream receive failed. Displayed verbatim.
    #[error("{0}")]
    Transport(#[source] BoxError),

    /// The dedup key function rejected a message.
    #[error("failed to compute message key: {0}")]
    MessageKey(#[source] BoxError),

    /// Writing to the response sink failed (usually a client disconnect).
    #[error("failed to write response: {0}")]
    Io(#[from] std::io::Error),

    /// The stream context was cancelled.
    #[error("stream context cancelled")]
    Cancelled,
}

impl ForwardError {
    /// Wrap an upstream receive error.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    /// Whether this is the cancellation signal rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for forwarder operations.
pub type Result<T> = std::result::Result<T, ForwardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn transport_displays_verbatim() {
        let err = ForwardError::transport("upstream reset");
        assert_eq!(err.to_string(), "upstream reset");
        assert!(err.source().is_some());
    }

    #[test]
    fn message_key_keeps_source() {
        let err = ForwardError::MessageKey("missing name".into());
        assert_eq!(err.to_string(), "failed to compute message key: missing name");
        assert!(err.source().is_some());
    }

    #[test]
    fn io_from_conversion() {
        let err: ForwardError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert!(matches!(err, ForwardError::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn cancelled_is_cancelled() {
        assert!(ForwardError::Cancelled.is_cancelled());
        assert!(!ForwardError::transport("x").is_cancelled());
    }
}
