//! Byte chunks to complete text lines.
//!
//! Chunk boundaries from the network are arbitrary: a line, or a single
//! UTF-8 character, may be split across any number of reads. The decoder
//! keeps the undecoded tail of a multi-byte sequence and the unterminated
//! tail of the last line until more input arrives.

use crate::error::StreamError;

/// Incremental line decoder.
///
/// Invariant: `buffer` never contains a `\n` between calls, and `pending`
/// holds at most the first three bytes of one incomplete UTF-8 sequence.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes of a multi-byte character whose remainder is in a later chunk.
    pending: Vec<u8>,
    /// Decoded text of the current, not yet terminated, line.
    buffer: String,
    /// Invalid input seen by the last `decode`, not yet taken.
    error: Option<StreamError>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every line it completes.
    ///
    /// Lines are returned without their trailing `\n`. Blank lines are kept;
    /// skipping them is the interpreter's job.
    ///
    /// If the chunk contains invalid UTF-8, the lines completed before the
    /// bad sequence are still returned, the rest of the chunk is dropped
    /// and the error is held for [`FrameDecoder::take_error`].
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }
        if let Err(err) = self.append_bytes(chunk) {
            self.error = Some(err);
        }
        self.take_lines()
    }

    /// The invalid-input error from the last [`FrameDecoder::decode`], if
    /// any. Fatal: nothing decoded after it can be trusted.
    pub fn take_error(&mut self) -> Option<StreamError> {
        self.error.take()
    }

    /// Feed already-decoded text.
    pub fn push_str(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);
        self.take_lines()
    }

    /// Flush at end of stream.
    ///
    /// Returns the unterminated remainder as a final line if it is
    /// non-empty. Fails if the stream ended inside a UTF-8 sequence.
    pub fn finish(&mut self) -> Result<Option<String>, StreamError> {
        if !self.pending.is_empty() {
            let count = self.pending.len();
            self.pending.clear();
            return Err(StreamError::Decode {
                message: format!(
                    "stream ended inside a multi-byte UTF-8 sequence ({} dangling bytes)",
                    count
                ),
            });
        }
        if self.buffer.is_empty() {
            return Ok(None);
        }
        Ok(Some(std::mem::take(&mut self.buffer)))
    }

    /// The unterminated text held so far.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.pending.is_empty()
    }

    fn append_bytes(&mut self, chunk: &[u8]) -> Result<(), StreamError> {
        let bytes = if self.pending.is_empty() {
            chunk.to_vec()
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            joined
        };

        match std::str::from_utf8(&bytes) {
            Ok(text) => {
                self.buffer.push_str(text);
                Ok(())
            }
            Err(err) => {
                let valid = err.valid_up_to();
                let (text, tail) = bytes.split_at(valid);
                let text = std::str::from_utf8(text).map_err(|e| StreamError::Decode {
                    message: e.to_string(),
                })?;
                self.buffer.push_str(text);

                if let Some(bad_len) = err.error_len() {
                    return Err(StreamError::Decode {
                        message: format!(
                            "invalid UTF-8 sequence of {} bytes at offset {}",
                            bad_len, valid
                        ),
                    });
                }
                // Incomplete trailing sequence: keep it for the next chunk.
                self.pending = tail.to_vec();
                Ok(())
            }
        }
    }

    fn take_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete[..last_newline]
            .split('\n')
            .map(str::to_string)
            .collect()
    }
}
