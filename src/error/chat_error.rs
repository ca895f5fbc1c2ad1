//! Unified error type for the crate.

use std::fmt;

use super::category::ErrorCategory;
use super::context::ErrorContext;
use super::network::NetworkError;
use super::stream::StreamError;

/// Unified error type.
///
/// Consolidates the domain errors so callers get one categorization, one
/// retry policy and one user message surface.
#[derive(Debug)]
pub enum ChatError {
    /// HTTP-level failures talking to the model server.
    Network(NetworkError),

    /// Failures while consuming a streamed response.
    Stream(StreamError),

    /// Invalid or unreadable configuration.
    Config { message: String },

    /// Filesystem or OS failures.
    System { operation: String, message: String },

    /// Wrapped error with additional context.
    WithContext {
        error: Box<ChatError>,
        context: ErrorContext,
    },
}

impl ChatError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChatError::Network(NetworkError::HttpStatus { status, .. }) if *status < 500 => {
                ErrorCategory::User
            }
            ChatError::Network(NetworkError::Cancelled) => ErrorCategory::User,
            ChatError::Network(_) => ErrorCategory::Network,
            ChatError::Stream(err) => match err {
                StreamError::Transport { .. } => ErrorCategory::Network,
                StreamError::Decode { .. } | StreamError::InvalidJson { .. } => {
                    ErrorCategory::Client
                }
                StreamError::Aborted { .. } => ErrorCategory::User,
            },
            ChatError::Config { .. } => ErrorCategory::Configuration,
            ChatError::System { .. } => ErrorCategory::System,
            ChatError::WithContext { error, .. } => error.category(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Network(err) => err.is_retryable(),
            ChatError::Stream(err) => err.is_retryable(),
            ChatError::Config { .. } => false,
            ChatError::System { .. } => false,
            ChatError::WithContext { error, .. } => error.is_retryable(),
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Network(err) => err.user_message(),
            ChatError::Stream(err) => err.user_message(),
            ChatError::Config { message } => format!("Configuration error: {}", message),
            ChatError::System { operation, .. } => {
                format!("A system error occurred during {}.", operation)
            }
            ChatError::WithContext { error, .. } => error.user_message(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ChatError::Network(err) => err.error_code(),
            ChatError::Stream(err) => err.error_code(),
            ChatError::Config { .. } => "E_CONFIG",
            ChatError::System { .. } => "E_SYSTEM",
            ChatError::WithContext { error, .. } => error.error_code(),
        }
    }

    /// Attach context to this error.
    pub fn with_context(self, ctx: ErrorContext) -> Self {
        ChatError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    /// Get the context if this error has one attached.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ChatError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the inner error without context.
    pub fn inner(&self) -> &ChatError {
        match self {
            ChatError::WithContext { error, .. } => error.inner(),
            _ => self,
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Network(err) => write!(f, "{}", err),
            ChatError::Stream(err) => write!(f, "{}", err),
            ChatError::Config { message } => write!(f, "Configuration error: {}", message),
            ChatError::System { operation, message } => {
                write!(f, "{} failed: {}", operation, message)
            }
            ChatError::WithContext { error, context } => {
                write!(f, "{} ({})", error, context)
            }
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Network(err) => Some(err),
            ChatError::Stream(err) => Some(err),
            ChatError::Config { .. } | ChatError::System { .. } => None,
            ChatError::WithContext { error, .. } => error.source(),
        }
    }
}

// ============================================================================
// From implementations
// ============================================================================

impl From<NetworkError> for ChatError {
    fn from(err: NetworkError) -> Self {
        ChatError::Network(err)
    }
}

impl From<StreamError> for ChatError {
    fn from(err: StreamError) -> Self {
        ChatError::Stream(err)
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::System {
            operation: "I/O operation".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Network(NetworkError::InvalidResponse {
            message: err.to_string(),
        })
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        ChatError::Network(super::network::classify_reqwest_error(&err, &url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{AbortReason, StreamFormat};

    #[test]
    fn test_category_mapping() {
        let err: ChatError = NetworkError::HttpStatus {
            status: 400,
            message: "bad".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::User);

        let err: ChatError = NetworkError::HttpStatus {
            status: 503,
            message: "down".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Network);

        let err: ChatError = StreamError::InvalidJson {
            format: StreamFormat::Sse,
            message: "eof".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Client);

        let err: ChatError = StreamError::Aborted {
            reason: AbortReason::User,
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::User);
    }

    #[test]
    fn test_context_propagation() {
        let err: ChatError = NetworkError::Timeout {
            operation: "generate".to_string(),
            duration_secs: 50,
        }
        .into();

        let with_ctx = err.with_context(ErrorContext::new("generate_stream").with_model("llama3"));

        assert_eq!(with_ctx.context().unwrap().operation, "generate_stream");
        assert_eq!(with_ctx.category(), ErrorCategory::Network);
        assert!(with_ctx.is_retryable());
        assert_eq!(with_ctx.error_code(), "E_NET_TIMEOUT");
        assert!(matches!(with_ctx.inner(), ChatError::Network(_)));
        assert!(with_ctx.to_string().contains("model=llama3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: ChatError = io_err.into();
        assert_eq!(err.category(), ErrorCategory::System);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ChatError = json_err.into();
        assert!(matches!(
            err,
            ChatError::Network(NetworkError::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_stream_error_user_message_is_generic() {
        let err: ChatError = StreamError::Transport {
            message: "reset".to_string(),
        }
        .into();
        assert_eq!(
            err.user_message(),
            "An error occurred while generating the response."
        );
    }
}
