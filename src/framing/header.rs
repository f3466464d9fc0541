//! Resumable `Content-Length` header parser.
//!
//! The parser consumes bytes from the front of a [`BytesMut`] and keeps
//! enough state to resume exactly where it stopped when the buffer runs dry.
//! Bytes already matched are never re-read or re-validated.
//!
//! Accepted grammar, byte-exact:
//!
//! ```text
//! "Content-Length: " DIGIT+ "\r\n\r\n"
//! ```
//!
//! No other header is recognized and the parser never scans forward looking
//! for a header inside garbage: the first mismatching byte ends the attempt.

use std::fmt::{Display, Formatter};

use bytes::{Buf, BytesMut};

use super::DEFAULT_MAX_MESSAGE_BYTES;

const HEADER_PREFIX: &[u8] = b"Content-Length: ";

/// Bytes that must follow the `\r` ending the digit run.
const HEADER_SUFFIX: &[u8] = b"\n\r\n";

/// Longest accepted digit run, leading zeros included.
pub const MAX_LENGTH_DIGITS: usize = 20;

/// Malformed header detected while parsing.
///
/// Every variant carries the bytes consumed by the failed attempt; those
/// bytes are gone from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// A byte did not match the literal `Content-Length: ` prefix.
    HeaderMismatch {
        /// Bytes consumed by the attempt, including the offending one.
        seen: Vec<u8>,
    },
    /// The length was empty, contained a non-digit, was longer than
    /// [`MAX_LENGTH_DIGITS`], or overflowed.
    InvalidLength {
        /// Bytes consumed by the attempt, including the offending one.
        seen: Vec<u8>,
    },
    /// The header declared a zero-length body.
    ZeroLength {
        /// The complete header.
        seen: Vec<u8>,
    },
    /// The declared length exceeds the configured maximum.
    TooLarge {
        /// Declared body length.
        length: usize,
        /// Configured maximum.
        max: usize,
        /// The complete header.
        seen: Vec<u8>,
    },
    /// The digit run was not followed by `\r\n\r\n`.
    BadTerminator {
        /// Bytes consumed by the attempt, including the offending one.
        seen: Vec<u8>,
    },
}

impl FramingError {
    /// Bytes consumed by the failed attempt.
    #[must_use]
    pub fn seen(&self) -> &[u8] {
        match self {
            Self::HeaderMismatch { seen }
            | Self::InvalidLength { seen }
            | Self::ZeroLength { seen }
            | Self::TooLarge { seen, .. }
            | Self::BadTerminator { seen } => seen,
        }
    }
}

impl Display for FramingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeaderMismatch { seen } => {
                write!(f, "invalid message header: '{}'", seen.escape_ascii())
            }
            Self::InvalidLength { seen } => write!(
                f,
                "content length must be a decimal number: '{}'",
                seen.escape_ascii()
            ),
            Self::ZeroLength { .. } => f.write_str("content length must be greater than 0"),
            Self::TooLarge { length, max, .. } => {
                write!(f, "content length {length} exceeds maximum {max}")
            }
            Self::BadTerminator { seen } => write!(
                f,
                "content length must end with \\r\\n\\r\\n: '{}'",
                seen.escape_ascii()
            ),
        }
    }
}

impl std::error::Error for FramingError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Matching `Content-Length: `; `matched` prefix bytes seen so far.
    Header { matched: usize },
    /// Accumulating the decimal length.
    Length { digits: usize, value: usize },
    /// `\r` seen; matching the rest of the terminator.
    Newlines { matched: usize, value: usize },
}

impl State {
    const INITIAL: Self = Self::Header { matched: 0 };
}

enum Step {
    Continue,
    Done(usize),
    Fail(FramingError),
}

/// Incremental parser for one framed stream.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use lsp_recorder::framing::ContentHeaderParser;
///
/// let mut parser = ContentHeaderParser::new();
/// let mut buf = BytesMut::from(&b"Content-Len"[..]);
/// assert_eq!(parser.parse(&mut buf), Ok(None));
///
/// buf.extend_from_slice(b"gth: 42\r\n\r\n{");
/// assert_eq!(parser.parse(&mut buf), Ok(Some(42)));
/// assert_eq!(&buf[..], b"{");
/// ```
#[derive(Debug, Clone)]
pub struct ContentHeaderParser {
    state: State,
    seen: Vec<u8>,
    max_length: usize,
}

impl ContentHeaderParser {
    /// Parser accepting lengths up to [`DEFAULT_MAX_MESSAGE_BYTES`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_MESSAGE_BYTES)
    }

    /// Parser accepting lengths up to `max_length` bytes.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            state: State::INITIAL,
            seen: Vec::with_capacity(32),
            max_length,
        }
    }

    /// Whether no header bytes have been consumed since the last reset.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == State::INITIAL
    }

    /// Consume header bytes from the front of `buf`.
    ///
    /// - `Ok(Some(n))`: a complete header declaring an `n`-byte body was
    ///   consumed; the body starts at `buf[0]`.
    /// - `Ok(None)`: every available byte was consumed and is valid so far;
    ///   call again once more bytes have been appended.
    /// - `Err(_)`: the bytes consumed by this attempt were malformed. They
    ///   are dropped and the next call starts a fresh header.
    ///
    /// # Errors
    ///
    /// Returns a [`FramingError`] describing the malformed header.
    pub fn parse(&mut self, buf: &mut BytesMut) -> Result<Option<usize>, FramingError> {
        let mut consumed = 0;
        let outcome = loop {
            let Some(&byte) = buf.get(consumed) else {
                break Ok(None);
            };
            consumed += 1;
            match self.step(byte) {
                Step::Continue => {}
                Step::Done(length) => break Ok(Some(length)),
                Step::Fail(err) => break Err(err),
            }
        };
        buf.advance(consumed);
        outcome
    }

    fn step(&mut self, byte: u8) -> Step {
        self.seen.push(byte);
        match self.state {
            State::Header { matched } => {
                if byte != HEADER_PREFIX[matched] {
                    let seen = self.reset();
                    return Step::Fail(FramingError::HeaderMismatch { seen });
                }
                self.state = if matched + 1 == HEADER_PREFIX.len() {
                    State::Length { digits: 0, value: 0 }
                } else {
                    State::Header {
                        matched: matched + 1,
                    }
                };
                Step::Continue
            }
            State::Length { digits, value } => match byte {
                b'\r' if digits > 0 => {
                    self.state = State::Newlines { matched: 0, value };
                    Step::Continue
                }
                b'0'..=b'9' if digits < MAX_LENGTH_DIGITS => {
                    let next = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(usize::from(byte - b'0')));
                    if let Some(value) = next {
                        self.state = State::Length {
                            digits: digits + 1,
                            value,
                        };
                        Step::Continue
                    } else {
                        let seen = self.reset();
                        Step::Fail(FramingError::InvalidLength { seen })
                    }
                }
                _ => {
                    let seen = self.reset();
                    Step::Fail(FramingError::InvalidLength { seen })
                }
            },
            State::Newlines { matched, value } => {
                if byte != HEADER_SUFFIX[matched] {
                    let seen = self.reset();
                    return Step::Fail(FramingError::BadTerminator { seen });
                }
                if matched + 1 < HEADER_SUFFIX.len() {
                    self.state = State::Newlines {
                        matched: matched + 1,
                        value,
                    };
                    return Step::Continue;
                }
                let seen = self.reset();
                if value == 0 {
                    Step::Fail(FramingError::ZeroLength { seen })
                } else if value > self.max_length {
                    Step::Fail(FramingError::TooLarge {
                        length: value,
                        max: self.max_length,
                        seen,
                    })
                } else {
                    Step::Done(value)
                }
            }
        }
    }

    /// Return to the initial state, handing back the bytes of the attempt.
    fn reset(&mut self) -> Vec<u8> {
        self.state = State::INITIAL;
        std::mem::take(&mut self.seen)
    }
}

impl Default for ContentHeaderParser {
    fn default() -> Self {
        Self::new()
    }
}
