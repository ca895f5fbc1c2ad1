//! Common test utilities for integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use futures::stream::{self, Stream};
use ollama_chat::config::ClientConfig;
use ollama_chat::error::StreamError;
use ollama_chat::ollama::OllamaClient;
use ollama_chat::stream::{MessageDelta, StreamEvent, StreamHandler};

/// Records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub events: Vec<StreamEvent>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content fragments of every delta, in order (`None` when absent).
    pub fn fragments(&self) -> Vec<Option<String>> {
        self.events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Delta(delta) => Some(delta.content().map(str::to_string)),
                _ => None,
            })
            .collect()
    }

    pub fn parse_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Delta(_)))
            .count()
    }

    pub fn finishes(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Finished(content) => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&StreamError> {
        self.events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }
}

impl StreamHandler for RecordingHandler {
    fn on_parse(&mut self, delta: &MessageDelta) {
        self.events.push(StreamEvent::Delta(delta.clone()));
    }

    fn on_finish(&mut self, content: &str) {
        self.events.push(StreamEvent::Finished(content.to_string()));
    }

    fn on_error(&mut self, error: &StreamError) {
        self.events.push(StreamEvent::Error(error.clone()));
    }
}

/// A byte stream that yields `chunks` and then ends.
pub fn byte_stream(chunks: &[&str]) -> impl Stream<Item = Result<Bytes, String>> {
    let items: Vec<Result<Bytes, String>> = chunks
        .iter()
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk.as_bytes())))
        .collect();
    stream::iter(items)
}

/// A client pointed at a wiremock server.
pub fn client_for(uri: &str) -> OllamaClient {
    OllamaClient::new(ClientConfig::default().with_base_url(uri))
}

/// Newline-delimited JSON body from the given objects.
pub fn ndjson(lines: &[serde_json::Value]) -> String {
    lines.iter().map(|line| format!("{}\n", line)).collect()
}
