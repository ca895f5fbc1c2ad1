//! Builds conversation history from streamed responses.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StreamError;
use crate::models::{ChatMessage, GenerateRequest, ToolCall};
use crate::stream::{MessageDelta, StreamHandler};

/// One completed prompt/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub id: Uuid,
    pub prompt: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

type TextListener = Box<dyn FnMut(&str) + Send>;

/// A [`StreamHandler`] that records one reply.
///
/// Recoverable errors are logged and kept; a fatal error replaces the
/// reply with the generic failure message.
pub struct ConversationRecorder {
    prompt: String,
    response: String,
    context: Option<Vec<i64>>,
    tool_calls: Vec<ToolCall>,
    entry: Option<ConversationEntry>,
    failure: Option<StreamError>,
    warnings: Vec<StreamError>,
    listener: Option<TextListener>,
}

impl ConversationRecorder {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: String::new(),
            context: None,
            tool_calls: Vec::new(),
            entry: None,
            failure: None,
            warnings: Vec::new(),
            listener: None,
        }
    }

    /// Call `listener` with every content fragment as it arrives.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Reply text received so far.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Context tokens from the terminal delta, duplicates removed.
    pub fn context(&self) -> Option<&[i64]> {
        self.context.as_deref()
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    /// The finished entry, once the stream has completed.
    pub fn entry(&self) -> Option<&ConversationEntry> {
        self.entry.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.entry.is_some()
    }

    pub fn failure(&self) -> Option<&StreamError> {
        self.failure.as_ref()
    }

    /// Text to show the user for a failed generation.
    pub fn error_message(&self) -> Option<String> {
        self.failure.as_ref().map(StreamError::user_message)
    }

    /// Lines that were skipped because they could not be parsed.
    pub fn warnings(&self) -> &[StreamError] {
        &self.warnings
    }

    pub fn into_entry(self) -> Result<ConversationEntry, StreamError> {
        match (self.entry, self.failure) {
            (Some(entry), _) => Ok(entry),
            (None, Some(failure)) => Err(failure),
            (None, None) => Err(StreamError::Transport {
                message: "stream ended without completing".to_string(),
            }),
        }
    }
}

impl fmt::Debug for ConversationRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationRecorder")
            .field("prompt", &self.prompt)
            .field("response", &self.response)
            .field("context", &self.context)
            .field("entry", &self.entry)
            .field("failure", &self.failure)
            .field("warnings", &self.warnings.len())
            .finish()
    }
}

fn dedup_tokens(tokens: Vec<i64>) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(tokens.len());
    tokens.into_iter().filter(|t| seen.insert(*t)).collect()
}

impl StreamHandler for ConversationRecorder {
    fn on_parse(&mut self, delta: &MessageDelta) {
        if let Some(content) = delta.content() {
            self.response.push_str(content);
            if let Some(listener) = self.listener.as_mut() {
                listener(content);
            }
        }
        if let Some(calls) = delta.tool_calls() {
            self.tool_calls.extend(calls);
        }
        if delta.is_done() {
            if let Some(tokens) = delta.context() {
                self.context = Some(dedup_tokens(tokens));
            }
        }
    }

    fn on_finish(&mut self, content: &str) {
        // The session's accumulation is authoritative.
        self.response = content.to_string();
        self.entry = Some(ConversationEntry {
            id: Uuid::new_v4(),
            prompt: self.prompt.clone(),
            response: self.response.clone(),
            timestamp: Utc::now(),
        });
    }

    fn on_error(&mut self, error: &StreamError) {
        if error.is_fatal() {
            tracing::error!(code = error.error_code(), "generation failed: {}", error);
            self.failure = Some(error.clone());
        } else {
            tracing::warn!("{}", error);
            self.warnings.push(error.clone());
        }
    }
}

/// Completed exchanges plus the context to continue from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub entries: Vec<ConversationEntry>,
    #[serde(default)]
    pub context: Vec<i64>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finished recording. Returns the user-facing error text if
    /// the generation failed; the conversation is left unchanged then.
    pub fn record(&mut self, recorder: ConversationRecorder) -> Result<&ConversationEntry, String> {
        if let Some(context) = recorder.context() {
            self.context = context.to_vec();
        }
        match recorder.into_entry() {
            Ok(entry) => {
                self.entries.push(entry);
                self.entries
                    .last()
                    .ok_or_else(|| crate::error::GENERATION_FAILED_MESSAGE.to_string())
            }
            Err(err) => Err(err.user_message()),
        }
    }

    /// A generate request continuing this conversation.
    pub fn next_request(&self, model: &str, prompt: &str) -> GenerateRequest {
        GenerateRequest::new(model, prompt).with_context(self.context.clone())
    }

    /// The history as chat messages, followed by `prompt`.
    pub fn chat_messages(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.entries.len() * 2 + 1);
        for entry in &self.entries {
            messages.push(ChatMessage::user(entry.prompt.clone()));
            messages.push(ChatMessage::assistant(entry.response.clone()));
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.context.clear();
    }
}
