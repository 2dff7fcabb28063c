//! Line framing for the CLI's stream-json output
//!
//! Stdout arrives in arbitrary chunks: a JSON object may be split across
//! reads, several objects may share one read, and a multi-byte character
//! may straddle two reads. [`LineFramer`] keeps raw bytes until a newline
//! arrives and only then decodes the line, so none of that matters to the
//! caller.
//!
//! The framer remembers how far it has already scanned for a newline, so a
//! line arriving in many pieces costs O(total bytes) rather than
//! O(pieces x bytes).

use crate::error::{AgentError, Result};
use bytes::BytesMut;
use structclaude_protocol::AgentMessage;
use tracing::{debug, trace, warn};

/// Upper bound on bytes held while waiting for a newline (50 MiB)
pub const MAX_BUFFER_BYTES: usize = 50 * 1024 * 1024;

/// Characters of a line kept in a [`AgentError::Parse`]
const LINE_PREFIX_CHARS: usize = 120;

/// Incremental newline framer that yields the first structured result
#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
    search_offset: usize,
    max_buffer: usize,
    session_id: Option<String>,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Create a framer with the default [`MAX_BUFFER_BYTES`] limit
    pub fn new() -> Self {
        Self::with_max_buffer(MAX_BUFFER_BYTES)
    }

    /// Create a framer with a custom buffer limit
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            search_offset: 0,
            max_buffer: max_buffer.max(1),
            session_id: None,
        }
    }

    /// Feed a chunk; see [`LineFramer::feed_with`]
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<String>> {
        self.feed_with(chunk, |_| {})
    }

    /// Feed a chunk, reporting every complete non-empty line to `on_line`
    ///
    /// Returns the canonical JSON text of the first successful result's
    /// `structured_output`, or `None` when more input is needed. Lines after
    /// that result stay buffered and are seen by the next call.
    ///
    /// Lines that are not valid UTF-8 or not valid JSON are skipped.
    ///
    /// # Errors
    ///
    /// [`AgentError::Parse`] when the buffer would exceed its limit (the
    /// buffer is cleared, so the framer stays usable) or when the payload
    /// cannot be re-encoded.
    pub fn feed_with<F>(&mut self, chunk: &[u8], mut on_line: F) -> Result<Option<String>>
    where
        F: FnMut(&str),
    {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > self.max_buffer {
            let buffered = self.buffer.len();
            let line_prefix = prefix_of(&String::from_utf8_lossy(
                &self.buffer[..self.buffer.len().min(LINE_PREFIX_CHARS * 4)],
            ));
            self.reset();
            warn!(buffered, limit = self.max_buffer, "line buffer overflow, discarding");
            return Err(AgentError::Parse {
                line_prefix,
                cause: format!(
                    "line buffer overflow: {buffered} bytes exceeds the {} byte limit",
                    self.max_buffer
                ),
            });
        }

        loop {
            let Some(found) = self.buffer[self.search_offset..]
                .iter()
                .position(|&b| b == b'\n')
            else {
                self.search_offset = self.buffer.len();
                return Ok(None);
            };

            let end = self.search_offset + found;
            let line = self.buffer.split_to(end + 1);
            self.search_offset = 0;

            let Ok(text) = std::str::from_utf8(&line[..end]) else {
                debug!(bytes = end, "skipping line that is not valid UTF-8");
                continue;
            };
            let text = text.trim_matches(is_horizontal_whitespace);
            if text.is_empty() {
                continue;
            }

            on_line(text);

            let message = match AgentMessage::from_line(text) {
                Ok(message) => message,
                Err(e) => {
                    trace!(error = %e, "skipping line that is not an event");
                    continue;
                }
            };

            if let Some(id) = message.session_id() {
                self.session_id = Some(id.to_string());
            }

            if let Some(payload) = message.terminal_payload() {
                let canonical = payload
                    .to_canonical_string()
                    .map_err(|e| AgentError::Parse {
                        line_prefix: prefix_of(text),
                        cause: e.to_string(),
                    })?;
                debug!(bytes = canonical.len(), "structured result received");
                return Ok(Some(canonical));
            }

            if message.is_payloadless_success() {
                warn!("successful result without structured_output, still waiting");
            }
        }
    }

    /// Bytes held waiting for a newline
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Position in the buffer up to which no newline exists
    pub fn search_offset(&self) -> usize {
        self.search_offset
    }

    /// Configured buffer limit
    pub fn max_buffer(&self) -> usize {
        self.max_buffer
    }

    /// Most recent CLI session identifier seen on the stream
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Drop everything buffered and release the allocation
    pub fn reset(&mut self) {
        self.buffer = BytesMut::new();
        self.search_offset = 0;
    }
}

/// Space, tab, carriage return and the Unicode horizontal spaces
fn is_horizontal_whitespace(c: char) -> bool {
    c.is_whitespace() && !matches!(c, '\n' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

fn prefix_of(text: &str) -> String {
    text.chars().take(LINE_PREFIX_CHARS).collect()
}
