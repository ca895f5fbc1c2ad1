use thiserror::Error;

use crate::error::{ChatError, NetworkError, StreamError};
use crate::stream::AbortReason;
use crate::traits::HttpError;

/// Errors returned by [`OllamaClient`](super::OllamaClient) before a
/// response stream is handed to the parser.
///
/// Once a stream is being parsed, failures reach the handler instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally; nothing was sent.
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Aborted while waiting for the server to start responding.
    #[error("Request aborted: {0}")]
    Aborted(AbortReason),
}

impl ClientError {
    /// HTTP status of a server-side rejection.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http(err) => err.status(),
            _ => None,
        }
    }
}

impl From<ClientError> for ChatError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::InvalidRequest(message) => {
                ChatError::Network(NetworkError::HttpStatus {
                    status: 400,
                    message,
                })
            }
            ClientError::Http(HttpError::InvalidUrl(message)) => ChatError::Config {
                message: format!("invalid server URL: {}", message),
            },
            ClientError::Http(err) => ChatError::Network(err.into()),
            ClientError::Decode { endpoint, source } => {
                ChatError::Network(NetworkError::InvalidResponse {
                    message: format!("{}: {}", endpoint, source),
                })
            }
            ClientError::Aborted(reason) => ChatError::Stream(StreamError::Aborted { reason }),
        }
    }
}
