//! Consumer side of a stream session.

use tokio::sync::mpsc;

use super::delta::MessageDelta;
use crate::error::StreamError;

/// Receives the events of one stream session.
///
/// Callbacks run synchronously on the session's task, in stream order.
/// `on_finish` and a fatal `on_error` are each delivered at most once and
/// never both; recoverable errors (see [`StreamError::is_fatal`]) may
/// arrive any number of times before either.
pub trait StreamHandler {
    /// A delta was parsed.
    fn on_parse(&mut self, delta: &MessageDelta);

    /// The stream completed. `content` is every content fragment, in order.
    fn on_finish(&mut self, content: &str);

    /// Something went wrong.
    fn on_error(&mut self, error: &StreamError);
}

impl<H: StreamHandler + ?Sized> StreamHandler for &mut H {
    fn on_parse(&mut self, delta: &MessageDelta) {
        (**self).on_parse(delta)
    }

    fn on_finish(&mut self, content: &str) {
        (**self).on_finish(content)
    }

    fn on_error(&mut self, error: &StreamError) {
        (**self).on_error(error)
    }
}

impl<H: StreamHandler + ?Sized> StreamHandler for Box<H> {
    fn on_parse(&mut self, delta: &MessageDelta) {
        (**self).on_parse(delta)
    }

    fn on_finish(&mut self, content: &str) {
        (**self).on_finish(content)
    }

    fn on_error(&mut self, error: &StreamError) {
        (**self).on_error(error)
    }
}

/// A handler built from three closures.
pub struct CallbackHandler<P, F, E> {
    on_parse: P,
    on_finish: F,
    on_error: E,
}

impl<P, F, E> CallbackHandler<P, F, E>
where
    P: FnMut(&MessageDelta),
    F: FnMut(&str),
    E: FnMut(&StreamError),
{
    pub fn new(on_parse: P, on_finish: F, on_error: E) -> Self {
        Self {
            on_parse,
            on_finish,
            on_error,
        }
    }
}

impl<P, F, E> StreamHandler for CallbackHandler<P, F, E>
where
    P: FnMut(&MessageDelta),
    F: FnMut(&str),
    E: FnMut(&StreamError),
{
    fn on_parse(&mut self, delta: &MessageDelta) {
        (self.on_parse)(delta)
    }

    fn on_finish(&mut self, content: &str) {
        (self.on_finish)(content)
    }

    fn on_error(&mut self, error: &StreamError) {
        (self.on_error)(error)
    }
}

/// Session events as owned values.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta(MessageDelta),
    Finished(String),
    Error(StreamError),
}

/// Forwards events to another task over an unbounded channel.
///
/// Sends after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelHandler {
    pub fn new(tx: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self { tx }
    }

    /// A handler and the receiver its events arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, event: StreamEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("stream event receiver dropped");
        }
    }
}

impl StreamHandler for ChannelHandler {
    fn on_parse(&mut self, delta: &MessageDelta) {
        self.send(StreamEvent::Delta(delta.clone()));
    }

    fn on_finish(&mut self, content: &str) {
        self.send(StreamEvent::Finished(content.to_string()));
    }

    fn on_error(&mut self, error: &StreamError) {
        self.send(StreamEvent::Error(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamFormat;
    use serde_json::{json, Map, Value};

    fn delta(value: Value) -> MessageDelta {
        let fields: Map<String, Value> = serde_json::from_value(value).unwrap();
        MessageDelta::new(StreamFormat::LineJson, fields)
    }

    #[test]
    fn test_callback_handler_routes_each_callback() {
        let mut parsed = Vec::new();
        let mut finished = None;
        let mut errors = 0;

        {
            let mut handler = CallbackHandler::new(
                |d: &MessageDelta| parsed.push(d.content().unwrap_or_default().to_string()),
                |content: &str| finished = Some(content.to_string()),
                |_: &StreamError| errors += 1,
            );
            handler.on_parse(&delta(json!({"response": "a"})));
            handler.on_error(&StreamError::Transport {
                message: "reset".to_string(),
            });
            handler.on_finish("a");
        }

        assert_eq!(parsed, vec!["a"]);
        assert_eq!(finished.as_deref(), Some("a"));
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_channel_handler_forwards_events() {
        let (mut handler, mut rx) = ChannelHandler::channel();
        handler.on_parse(&delta(json!({"response": "x"})));
        handler.on_finish("x");

        assert!(matches!(rx.try_recv().unwrap(), StreamEvent::Delta(_)));
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Finished("x".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_handler_ignores_closed_receiver() {
        let (mut handler, rx) = ChannelHandler::channel();
        drop(rx);
        handler.on_finish("ignored");
    }

    #[test]
    fn test_boxed_and_borrowed_handlers() {
        let (inner, mut rx) = ChannelHandler::channel();
        let mut boxed: Box<dyn StreamHandler> = Box::new(inner);

        fn finish_with(mut handler: impl StreamHandler, content: &str) {
            handler.on_finish(content);
        }
        finish_with(&mut boxed, "done");

        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Finished("done".to_string()));
    }
}
