use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Every failure mode surfaced by the chat gateway.
///
/// All variants are terminal for the call that produced them. Nothing is retried
/// internally; callers decide whether a failure is worth another attempt.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request could not be serialized. No I/O was attempted.
    #[error("failed to encode request: {message}")]
    Encoding { message: String },
    /// Connection, timeout or cancellation failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The vendor answered with a non-2xx status.
    #[error("vendor error: status={status}, body={body}")]
    Vendor {
        /// HTTP status code returned by the vendor.
        status: u16,
        /// Raw response body, kept verbatim for diagnostics.
        body: String,
    },
    /// A complete (non-streaming) response body could not be decoded.
    #[error("failed to decode response: {message}")]
    Decoding { message: String },
    /// The stream consumer rejected a delivered chunk and the stream was aborted.
    #[error("stream aborted by sink: {source}")]
    SinkAbort {
        #[source]
        source: SinkError,
    },
    /// The gateway was built without credentials or endpoint.
    #[error("chat gateway client not initialized")]
    NotInitialized,
    /// Raised when building the gateway from configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Why the field is invalid.
        reason: String,
    },
}

impl GatewayError {
    /// Creates a [`GatewayError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_chat_gateway::error::GatewayError;
    ///
    /// let err = GatewayError::transport("connection reset");
    /// assert!(matches!(err, GatewayError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Transport error reported when the caller cancels an in-flight call.
    pub fn cancelled() -> Self {
        Self::transport("request cancelled")
    }

    pub(crate) fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Extracts a readable message from a [`GatewayError::Vendor`] body.
    ///
    /// OpenAI-compatible vendors wrap failures as `{"error": {"message": .., "code": ..}}`.
    /// When the body has that shape the message (and code, if any) is returned;
    /// otherwise the raw body is returned as-is. Other variants yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_chat_gateway::error::GatewayError;
    ///
    /// let err = GatewayError::Vendor {
    ///     status: 401,
    ///     body: r#"{"error":{"message":"bad key","code":"invalid_api_key"}}"#.to_string(),
    /// };
    /// assert_eq!(err.vendor_message().as_deref(), Some("bad key (\"invalid_api_key\")"));
    /// ```
    pub fn vendor_message(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: Option<InnerError>,
        }
        #[derive(Deserialize)]
        struct InnerError {
            message: Option<String>,
            code: Option<Value>,
        }

        let Self::Vendor { body, .. } = self else {
            return None;
        };
        let parsed = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.error);
        match parsed {
            Some(error) => {
                let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
                if let Some(code) = error.code.filter(|code| !code.is_null()) {
                    message = format!("{message} ({code})");
                }
                Some(message)
            }
            None => Some(body.clone()),
        }
    }
}

/// Failure reported by a [`crate::sink::StreamSink`] when it cannot accept a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The downstream consumer went away.
    pub fn disconnected() -> Self {
        Self::new("stream consumer disconnected")
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
