//! LSP message framing.
//!
//! LSP carries JSON-RPC messages over stdio as
//! `Content-Length: N\r\n\r\n<N bytes of body>`. This module recovers those
//! messages from an arbitrarily chunked byte stream:
//!
//! - `header`: the resumable [`ContentHeaderParser`] state machine.
//! - `codec`: [`MessageCodec`], a [`tokio_util::codec::Decoder`] that owns
//!   the awaited body length and turns a pending-payload buffer into
//!   [`Frame`]s.

pub mod codec;
pub mod header;

pub use codec::{Frame, InvalidRun, MessageCodec};
pub use header::{ContentHeaderParser, FramingError, MAX_LENGTH_DIGITS};

/// Default upper bound on a declared `Content-Length`: 64 MiB.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;
