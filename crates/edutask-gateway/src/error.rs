//! Gateway error types.

use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while bridging one call.
///
/// Transport failures come from the adapter itself; `Handler` and
/// `HandlerPanicked` wrap failures raised inside the application.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid header encoding: {0}")]
    InvalidHeaderEncoding(String),

    #[error("invalid response status: {0}")]
    InvalidStatus(u16),

    #[error("application returned without starting a response")]
    ResponseNotStarted,

    #[error("response already started")]
    DuplicateResponseStart,

    #[error("response body sent before response start")]
    BodyBeforeStart,

    #[error("event sent after response completed")]
    EventAfterComplete,

    #[error("response stream has not ended")]
    ResponseIncomplete,

    #[error("event channel closed")]
    ChannelClosed,

    #[error("call cancelled")]
    Cancelled,

    #[error("blocking call made from inside an async runtime")]
    NestedRuntime,

    #[error("failed to build call runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("{0}")]
    Handler(#[from] anyhow::Error),

    #[error("application panicked: {0}")]
    HandlerPanicked(String),
}

impl GatewayError {
    /// Recover a gateway error that an application propagated with `?`.
    ///
    /// Applications return `anyhow::Result`, so a `Cancelled` raised by
    /// `recv()` or `send()` comes back wrapped. Unwrap it so the caller
    /// sees the transport error rather than a handler failure.
    pub fn from_handler(err: anyhow::Error) -> Self {
        match err.downcast::<GatewayError>() {
            Ok(gateway) => gateway,
            Err(other) => GatewayError::Handler(other),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_displays_message_verbatim() {
        let err = GatewayError::from_handler(anyhow::anyhow!("database unreachable"));
        assert!(matches!(err, GatewayError::Handler(_)));
        assert_eq!(err.to_string(), "database unreachable");
    }

    #[test]
    fn from_handler_unwraps_gateway_errors() {
        let wrapped = anyhow::Error::new(GatewayError::Cancelled);
        let err = GatewayError::from_handler(wrapped);
        assert!(err.is_cancelled());
    }

    #[test]
    fn transport_errors_have_messages() {
        assert_eq!(
            GatewayError::InvalidStatus(42).to_string(),
            "invalid response status: 42"
        );
        assert_eq!(
            GatewayError::ResponseNotStarted.to_string(),
            "application returned without starting a response"
        );
    }
}
