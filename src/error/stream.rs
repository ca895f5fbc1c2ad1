//! Streaming-related error types.
//!
//! Errors raised while consuming a streamed model response. Only
//! [`StreamError::InvalidJson`] is recoverable: the session reports it and
//! keeps reading. Every other variant ends the session.

use std::fmt;

use crate::stream::{AbortReason, StreamFormat};

/// Text shown to the user whenever a generation fails.
pub const GENERATION_FAILED_MESSAGE: &str = "An error occurred while generating the response.";

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// The byte stream contained invalid UTF-8, or ended inside a
    /// multi-byte sequence.
    Decode { message: String },

    /// A complete line could not be parsed as JSON.
    InvalidJson { format: StreamFormat, message: String },

    /// The underlying reader failed (network drop, server reset).
    Transport { message: String },

    /// The abort signal fired before the stream completed.
    Aborted { reason: AbortReason },
}

impl StreamError {
    /// Returns true when this error terminates the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StreamError::InvalidJson { .. })
    }

    /// Returns true for errors caused by the abort signal.
    pub fn is_abort(&self) -> bool {
        matches!(self, StreamError::Aborted { .. })
    }

    /// Check if the request that produced this stream can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamError::Transport { .. }
                | StreamError::Aborted {
                    reason: AbortReason::Timeout
                }
        )
    }

    /// Message displayed by the chat front end. Deliberately generic.
    pub fn user_message(&self) -> String {
        GENERATION_FAILED_MESSAGE.to_string()
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::Decode { .. } => "E_STREAM_DECODE",
            StreamError::InvalidJson { .. } => "E_STREAM_JSON",
            StreamError::Transport { .. } => "E_STREAM_TRANSPORT",
            StreamError::Aborted { .. } => "E_STREAM_ABORT",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Decode { message } => {
                write!(f, "Stream decode error: {}", message)
            }
            StreamError::InvalidJson { format, message } => {
                write!(f, "{} JSON parsing error: {}", format.label(), message)
            }
            StreamError::Transport { message } => {
                write!(f, "Stream read failed: {}", message)
            }
            StreamError::Aborted { reason } => write!(f, "Stream aborted: {}", reason),
        }
    }
}

impl std::error::Error for StreamError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_json_is_recoverable() {
        let err = StreamError::InvalidJson {
            format: StreamFormat::LineJson,
            message: "expected value at line 1 column 1".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(!err.is_retryable());
        assert_eq!(err.error_code(), "E_STREAM_JSON");
    }

    #[test]
    fn test_invalid_json_display_is_format_tagged() {
        let ollama = StreamError::InvalidJson {
            format: StreamFormat::LineJson,
            message: "eof".to_string(),
        };
        assert_eq!(ollama.to_string(), "Ollama JSON parsing error: eof");

        let openai = StreamError::InvalidJson {
            format: StreamFormat::Sse,
            message: "eof".to_string(),
        };
        assert_eq!(openai.to_string(), "OpenAI JSON parsing error: eof");
    }

    #[test]
    fn test_fatal_variants() {
        let errors = [
            StreamError::Decode {
                message: "invalid utf-8".to_string(),
            },
            StreamError::Transport {
                message: "connection reset".to_string(),
            },
            StreamError::Aborted {
                reason: AbortReason::User,
            },
        ];
        for err in errors {
            assert!(err.is_fatal(), "{:?} should be fatal", err);
        }
    }

    #[test]
    fn test_abort_classification() {
        let timeout = StreamError::Aborted {
            reason: AbortReason::Timeout,
        };
        assert!(timeout.is_abort());
        assert!(timeout.is_retryable());

        let user = StreamError::Aborted {
            reason: AbortReason::User,
        };
        assert!(user.is_abort());
        assert!(!user.is_retryable());
    }

    #[test]
    fn test_user_message_is_generic() {
        let err = StreamError::Transport {
            message: "socket closed".to_string(),
        };
        assert_eq!(err.user_message(), GENERATION_FAILED_MESSAGE);
    }
}
