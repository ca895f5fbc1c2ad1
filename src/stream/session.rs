//! The read loop that turns a chunked response body into handler callbacks.

use std::fmt::Display;
use std::ops::ControlFlow;

use futures::{Stream, StreamExt};
use tracing::{debug, error, trace, warn};

use super::abort::AbortSignal;
use super::decoder::FrameDecoder;
use super::format::{Frame, StreamFormat};
use super::handler::StreamHandler;
use crate::error::StreamError;

/// Where a session is in its lifecycle.
///
/// `Idle -> Reading -> {Draining, Finishing, Failed} -> Done`. Draining
/// moves on to Finishing or Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Reading,
    Draining,
    Finishing,
    Failed,
    Done,
}

/// Per-session options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamParserOptions {
    pub format: StreamFormat,
    /// Trace decoder buffers and every line seen.
    pub debug: bool,
}

impl StreamParserOptions {
    pub fn new(format: StreamFormat) -> Self {
        Self {
            format,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// One parser invocation against one byte stream.
///
/// Consumed by [`StreamSession::parse`]; the handler is handed back when the
/// stream has finished or failed.
#[derive(Debug)]
pub struct StreamSession<H> {
    format: StreamFormat,
    debug: bool,
    decoder: FrameDecoder,
    accumulated: String,
    state: SessionState,
    handler: H,
}

impl<H: StreamHandler> StreamSession<H> {
    pub fn new(handler: H, options: StreamParserOptions) -> Self {
        Self {
            format: options.format,
            debug: options.debug,
            decoder: FrameDecoder::new(),
            accumulated: String::new(),
            state: SessionState::Idle,
            handler,
        }
    }

    pub fn with_format(handler: H, format: StreamFormat) -> Self {
        Self::new(handler, StreamParserOptions::new(format))
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Consume `stream` to completion.
    pub async fn parse<S, B, E>(self, stream: S) -> H
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        self.parse_with_abort(stream, AbortSignal::never()).await
    }

    /// Consume `stream` until it ends, a terminal frame arrives, a fatal
    /// error occurs, or `abort` fires.
    ///
    /// Never returns an error: failures reach the handler's `on_error`.
    pub async fn parse_with_abort<S, B, E>(mut self, stream: S, mut abort: AbortSignal) -> H
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        futures::pin_mut!(stream);
        self.state = SessionState::Reading;
        debug!(format = %self.format, "stream session started");

        loop {
            let next = tokio::select! {
                biased;
                reason = abort.aborted() => Err(reason),
                item = stream.next() => Ok(item),
            };

            match next {
                Err(reason) => {
                    self.fail(StreamError::Aborted { reason });
                    break;
                }
                Ok(Some(Ok(chunk))) => {
                    let lines = self.decoder.decode(chunk.as_ref());
                    if self.debug {
                        trace!(
                            bytes = chunk.as_ref().len(),
                            lines = lines.len(),
                            buffered = self.decoder.buffered(),
                            "chunk decoded"
                        );
                    }
                    if self.dispatch(lines).is_break() {
                        break;
                    }
                    // Lines before an invalid sequence are delivered first.
                    if let Some(err) = self.decoder.take_error() {
                        self.fail(err);
                        break;
                    }
                }
                Ok(Some(Err(err))) => {
                    self.fail(StreamError::Transport {
                        message: err.to_string(),
                    });
                    break;
                }
                Ok(None) => {
                    self.drain();
                    break;
                }
            }
        }

        self.handler
    }

    fn dispatch(&mut self, lines: Vec<String>) -> ControlFlow<()> {
        for line in lines {
            if self.interpret(&line).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn interpret(&mut self, line: &str) -> ControlFlow<()> {
        if self.debug {
            trace!(line, "line");
        }

        match self.format.interpret(line) {
            Frame::Skip => ControlFlow::Continue(()),
            Frame::Delta(delta) => {
                if let Some(content) = delta.content() {
                    self.accumulated.push_str(content);
                }
                self.handler.on_parse(&delta);
                if delta.is_done() {
                    self.finish();
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
            Frame::Done => {
                self.finish();
                ControlFlow::Break(())
            }
            Frame::Invalid(err) => {
                warn!(error = %err, "skipping malformed line");
                self.handler.on_error(&err);
                ControlFlow::Continue(())
            }
        }
    }

    /// End of input: the unterminated remainder is the final line.
    fn drain(&mut self) {
        self.state = SessionState::Draining;
        match self.decoder.finish() {
            Ok(Some(line)) => {
                if self.interpret(&line).is_break() {
                    return;
                }
            }
            Ok(None) => {}
            Err(err) => {
                self.fail(err);
                return;
            }
        }
        self.finish();
    }

    fn finish(&mut self) {
        if self.state == SessionState::Done {
            return;
        }
        self.state = SessionState::Finishing;
        debug!(
            format = %self.format,
            chars = self.accumulated.len(),
            "stream session finished"
        );
        self.handler.on_finish(&self.accumulated);
        self.state = SessionState::Done;
    }

    fn fail(&mut self, err: StreamError) {
        if self.state == SessionState::Done {
            return;
        }
        self.state = SessionState::Failed;
        error!(error = %err, code = err.error_code(), "stream session failed");
        self.handler.on_error(&err);
        self.state = SessionState::Done;
    }
}

/// Parse `stream` in one call.
pub async fn parse_stream<S, B, E, H>(stream: S, options: StreamParserOptions, handler: H) -> H
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
    H: StreamHandler,
{
    StreamSession::new(handler, options).parse(stream).await
}
