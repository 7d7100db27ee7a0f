//! Error types shared by every layer of the codec.

use thiserror::Error;

/// An error raised while encoding or decoding an OSC atom, composite
/// structure, or while driving the streaming serial.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscError {
    /// The destination or source buffer is too small for the operation.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    Overrun {
        /// Bytes required to complete the operation.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },
    /// The encoded size would exceed `2^31 - 4` bytes.
    #[error("encoded size would exceed the {limit} byte ceiling")]
    SizeMax {
        /// The size ceiling, `2^31 - 4`.
        limit: usize,
    },
    /// A type tag or bundle marker is not valid.
    #[error("invalid type tag or bundle marker at offset {offset}")]
    Type {
        /// Offset of the first invalid byte.
        offset: usize,
    },
    /// An explicit packet size prefix was negative, not a multiple of 4, or
    /// below the minimum for its kind.
    #[error("invalid packet size prefix: {size}")]
    PacketSize {
        /// The offending size value.
        size: i64,
    },
    /// The level stack is full.
    #[error("level stack exhausted (max {max})")]
    LevelMax {
        /// Capacity of the caller-supplied level stack.
        max: usize,
    },
    /// The requested operation is incompatible with the innermost level's
    /// kind, or the message type tag has been fully consumed.
    #[error("operation not valid for the current level")]
    LevelType,
    /// A second outermost packet was written without the `PSIZE` flag set.
    #[error("multiple top-level packets require the PSIZE flag")]
    PrefixFlag,
    /// A value's type disagreed with the next type-tag character.
    #[error("type tag mismatch: expected '{expected}', found '{found}'")]
    MsgType {
        /// The type tag character the message actually expects next.
        expected: char,
        /// The character the caller attempted to write or read as.
        found: char,
    },
    /// `close(finalize = false)` was called on a level that still has
    /// unconsumed type-tag characters or blob bytes.
    #[error("level closed early, {missing} byte(s) short of its declared size")]
    Unfinished {
        /// Bytes (or, for a message, type-tag elements) left unconsumed.
        missing: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, OscError>;
