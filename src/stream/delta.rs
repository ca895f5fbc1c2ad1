use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::format::StreamFormat;
use crate::models::ToolCall;

/// One unit of model output parsed from one frame.
///
/// The parsed JSON object is kept verbatim; the accessors below normalize
/// the fields that differ between the two wire formats.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDelta {
    format: StreamFormat,
    fields: Map<String, Value>,
}

impl MessageDelta {
    pub fn new(format: StreamFormat, fields: Map<String, Value>) -> Self {
        Self { format, fields }
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// The full parsed object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The content fragment carried by this delta, if any.
    ///
    /// LineJson: `response` (generate) or `message.content` (chat).
    /// Sse: `choices[0].delta.content`.
    pub fn content(&self) -> Option<&str> {
        match self.format {
            StreamFormat::LineJson => self
                .fields
                .get("response")
                .and_then(Value::as_str)
                .or_else(|| {
                    self.fields
                        .get("message")
                        .and_then(|m| m.get("content"))
                        .and_then(Value::as_str)
                }),
            StreamFormat::Sse => self
                .first_choice()
                .and_then(|c| c.get("delta"))
                .and_then(|d| d.get("content"))
                .and_then(Value::as_str),
        }
    }

    /// Whether this delta ends a LineJson stream.
    ///
    /// Always false for Sse, which terminates on its sentinel line instead.
    pub fn is_done(&self) -> bool {
        match self.format {
            StreamFormat::LineJson => self
                .fields
                .get("done")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            StreamFormat::Sse => false,
        }
    }

    /// `done_reason` (LineJson) or `choices[0].finish_reason` (Sse).
    pub fn finish_reason(&self) -> Option<&str> {
        match self.format {
            StreamFormat::LineJson => self.fields.get("done_reason").and_then(Value::as_str),
            StreamFormat::Sse => self
                .first_choice()
                .and_then(|c| c.get("finish_reason"))
                .and_then(Value::as_str),
        }
    }

    /// Context tokens of a terminal LineJson generate delta.
    pub fn context(&self) -> Option<Vec<i64>> {
        if self.format != StreamFormat::LineJson {
            return None;
        }
        let tokens = self.fields.get("context")?.as_array()?;
        tokens.iter().map(Value::as_i64).collect()
    }

    /// Typed tool calls from `message.tool_calls`.
    ///
    /// Only LineJson chat deltas surface tool calls. Sse tool-call deltas
    /// remain available through [`MessageDelta::fields`].
    pub fn tool_calls(&self) -> Option<Vec<ToolCall>> {
        if self.format != StreamFormat::LineJson {
            return None;
        }
        let calls = self.fields.get("message")?.get("tool_calls")?;
        match serde_json::from_value::<Vec<ToolCall>>(calls.clone()) {
            Ok(calls) if !calls.is_empty() => Some(calls),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed tool_calls");
                None
            }
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.fields.get("model").and_then(Value::as_str)
    }

    fn first_choice(&self) -> Option<&Value> {
        self.fields.get("choices")?.as_array()?.first()
    }
}

impl Serialize for MessageDelta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
