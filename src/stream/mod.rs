//! Incremental parser for streamed model responses.
//!
//! A response body arrives as arbitrary byte chunks. [`FrameDecoder`] turns
//! them into complete lines, [`StreamFormat::interpret`] turns each line into
//! a [`Frame`], and [`StreamSession`] drives the loop and reports to a
//! [`StreamHandler`]:
//!
//! ```text
//! bytes ──▶ FrameDecoder ──▶ lines ──▶ StreamFormat ──▶ Frame ──▶ StreamHandler
//!                                                        │
//!                                  StreamSession (accumulate, terminate, abort)
//! ```

mod abort;
mod decoder;
mod delta;
mod format;
mod handler;
mod session;

pub use abort::{AbortController, AbortReason, AbortSignal, TimeoutGuard};
pub use decoder::FrameDecoder;
pub use delta::MessageDelta;
pub use format::{Frame, StreamFormat, UnknownFormat, DATA_PREFIX, DONE_SENTINEL};
pub use handler::{CallbackHandler, ChannelHandler, StreamEvent, StreamHandler};
pub use session::{parse_stream, SessionState, StreamParserOptions, StreamSession};
