//! Error handling for the chat client.
//!
//! - **Error Categories**: classification for retry and messaging decisions
//! - **Domain-specific Errors**: [`NetworkError`] and [`StreamError`]
//! - **Unified Error Type**: [`ChatError`] consolidates them
//! - **Error Context**: operation, model and request id attached to errors
//!
//! | Category | Description | Retryable |
//! |----------|-------------|-----------|
//! | Network | Connection, timeout, broken stream | Yes |
//! | Server | Model server errors (5xx) | Yes |
//! | Client | Malformed data, bugs | No |
//! | User | Bad request, user abort | No |
//! | System | Filesystem errors | No |
//! | Configuration | Settings issues | No |

mod category;
mod chat_error;
mod context;
mod network;
mod stream;

pub use category::ErrorCategory;
pub use chat_error::ChatError;
pub use context::ErrorContext;
pub use network::{classify_reqwest_error, NetworkError};
pub use stream::{StreamError, GENERATION_FAILED_MESSAGE};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::stream::{AbortReason, StreamFormat};

    #[test]
    fn test_error_unification() {
        let errors: Vec<ChatError> = vec![
            NetworkError::Timeout {
                operation: "generate".to_string(),
                duration_secs: 50,
            }
            .into(),
            StreamError::Transport {
                message: "lost".to_string(),
            }
            .into(),
            StreamError::InvalidJson {
                format: StreamFormat::LineJson,
                message: "eof".to_string(),
            }
            .into(),
            StreamError::Aborted {
                reason: AbortReason::Timeout,
            }
            .into(),
            ChatError::Config {
                message: "missing defaultModel".to_string(),
            },
        ];

        for err in &errors {
            assert!(!err.error_code().is_empty());
            assert!(!err.user_message().is_empty());
            assert!(!err.recovery_hint().is_empty());
        }
    }

    #[test]
    fn test_retry_logic() {
        let retryable: Vec<ChatError> = vec![
            NetworkError::ConnectionFailed {
                url: "http://localhost:11434".to_string(),
                message: "refused".to_string(),
            }
            .into(),
            StreamError::Transport {
                message: "reset".to_string(),
            }
            .into(),
        ];
        for err in retryable {
            assert!(err.is_retryable(), "Expected {:?} to be retryable", err);
        }

        let not_retryable: Vec<ChatError> = vec![
            StreamError::Decode {
                message: "bad byte".to_string(),
            }
            .into(),
            StreamError::Aborted {
                reason: AbortReason::User,
            }
            .into(),
            ChatError::Config {
                message: "bad".to_string(),
            },
        ];
        for err in not_retryable {
            assert!(!err.is_retryable(), "Expected {:?} to not be retryable", err);
        }
    }
}
