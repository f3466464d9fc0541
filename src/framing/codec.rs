//! Pending-payload decoder for framed LSP streams.
//!
//! [`MessageCodec`] drives a [`ContentHeaderParser`] over the bytes buffered
//! for one stream and yields one [`Frame`] per classified unit:
//!
//! - a complete message body once all of its declared bytes are buffered;
//! - an [`InvalidRun`] for bytes that failed header parsing.
//!
//! Only the bytes consumed by a failed header attempt are discarded. The
//! rest of the buffer is parsed again, and consecutive failures are merged
//! into a single run so that a burst of garbage yields one frame rather than
//! one per byte. Bytes past the end of a message stay buffered for the next
//! header.

use std::fmt::{Display, Formatter};

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use super::header::{ContentHeaderParser, FramingError};
use super::DEFAULT_MAX_MESSAGE_BYTES;
use crate::{AppError, Result};

/// Bytes rejected by the header parser, merged across consecutive failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRun {
    /// First failure of the run.
    pub error: FramingError,
    /// Bytes consumed by later failed attempts of the same run.
    pub skipped: BytesMut,
}

impl InvalidRun {
    /// Total number of bytes discarded by the run.
    #[must_use]
    pub fn discarded_len(&self) -> usize {
        self.error.seen().len() + self.skipped.len()
    }
}

impl Display for InvalidRun {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.skipped.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{}; skipped '{}'", self.error, self.skipped.escape_ascii())
        }
    }
}

/// One classified unit recovered from a framed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Exactly the declared number of body bytes.
    Message(Bytes),
    /// Bytes that could not be parsed as a header.
    Invalid(InvalidRun),
}

/// Decoder over a framed stream's pending-payload buffer.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::Decoder;
/// use lsp_recorder::framing::{Frame, MessageCodec};
///
/// let mut codec = MessageCodec::new();
/// let mut buf = BytesMut::from(&b"Content-Length: 2\r\n\r\n{}Content"[..]);
/// let frame = codec.decode(&mut buf).expect("decode never fails");
/// assert_eq!(frame, Some(Frame::Message(bytes::Bytes::from_static(b"{}"))));
/// assert_eq!(codec.decode(&mut buf).expect("decode never fails"), None);
/// ```
#[derive(Debug)]
pub struct MessageCodec {
    parser: ContentHeaderParser,
    awaiting: Option<usize>,
    invalid: Option<InvalidRun>,
}

impl MessageCodec {
    /// Codec accepting bodies up to [`DEFAULT_MAX_MESSAGE_BYTES`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_MESSAGE_BYTES)
    }

    /// Codec accepting bodies up to `max_length` bytes.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            parser: ContentHeaderParser::with_max_length(max_length),
            awaiting: None,
            invalid: None,
        }
    }

    /// Body length of the message currently being buffered, if any.
    #[must_use]
    pub fn awaiting_length(&self) -> Option<usize> {
        self.awaiting
    }

    fn note_invalid(&mut self, err: FramingError) {
        match self.invalid.as_mut() {
            Some(run) => run.skipped.extend_from_slice(err.seen()),
            None => {
                self.invalid = Some(InvalidRun {
                    error: err,
                    skipped: BytesMut::new(),
                });
            }
        }
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for MessageCodec {
    type Item = Frame;
    type Error = AppError;

    /// Classify the next unit from `src`.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Malformed headers are
    /// reported as [`Frame::Invalid`], never as an error.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            let length = if let Some(length) = self.awaiting {
                length
            } else {
                match self.parser.parse(src) {
                    Ok(Some(length)) => {
                        self.awaiting = Some(length);
                        length
                    }
                    Ok(None) => return Ok(self.invalid.take().map(Frame::Invalid)),
                    Err(err) => {
                        self.note_invalid(err);
                        continue;
                    }
                }
            };

            // A run of garbage is reported before the message that ends it.
            if let Some(run) = self.invalid.take() {
                return Ok(Some(Frame::Invalid(run)));
            }

            if src.len() < length {
                src.reserve(length - src.len());
                return Ok(None);
            }

            self.awaiting = None;
            return Ok(Some(Frame::Message(src.split_to(length).freeze())));
        }
    }
}
