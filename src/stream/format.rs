//! Line interpretation for the two wire formats the model server speaks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::delta::MessageDelta;
use crate::error::StreamError;

/// Terminal sentinel of an OpenAI-style event stream.
pub const DONE_SENTINEL: &str = "data: [DONE]";

/// Prefix of every payload-carrying event stream line.
pub const DATA_PREFIX: &str = "data: ";

/// Wire format of a streamed response. Selected once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StreamFormat {
    /// One JSON object per line (native `/api/generate`, `/api/chat`).
    #[default]
    #[serde(rename = "ollama")]
    LineJson,
    /// `data: <json>` event lines ending in `data: [DONE]`.
    #[serde(rename = "openai")]
    Sse,
}

impl StreamFormat {
    /// External name used on the command line and in settings.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamFormat::LineJson => "ollama",
            StreamFormat::Sse => "openai",
        }
    }

    /// Human-readable name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            StreamFormat::LineJson => "Ollama",
            StreamFormat::Sse => "OpenAI",
        }
    }

    /// Interpret one complete line.
    pub fn interpret(&self, line: &str) -> Frame {
        let line = line.trim();
        if line.is_empty() {
            return Frame::Skip;
        }

        match self {
            StreamFormat::LineJson => self.parse_object(line),
            StreamFormat::Sse => {
                if line == DONE_SENTINEL {
                    return Frame::Done;
                }
                match line.strip_prefix(DATA_PREFIX) {
                    Some(payload) => self.parse_object(payload),
                    // event:, id:, comments and anything else carry no delta
                    None => Frame::Skip,
                }
            }
        }
    }

    fn parse_object(&self, payload: &str) -> Frame {
        match serde_json::from_str::<Map<String, Value>>(payload) {
            Ok(fields) => Frame::Delta(MessageDelta::new(*self, fields)),
            Err(err) => Frame::Invalid(StreamError::InvalidJson {
                format: *self,
                message: err.to_string(),
            }),
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a format name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stream format '{0}' (expected 'ollama' or 'openai')")]
pub struct UnknownFormat(pub String);

impl FromStr for StreamFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ollama" => Ok(StreamFormat::LineJson),
            "openai" => Ok(StreamFormat::Sse),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

/// Outcome of interpreting one line.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Blank or non-payload line.
    Skip,
    /// A parsed delta.
    Delta(MessageDelta),
    /// The event-stream terminal sentinel.
    Done,
    /// The line could not be parsed. Recoverable.
    Invalid(StreamError),
}
