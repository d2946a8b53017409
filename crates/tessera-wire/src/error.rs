//! Wire codec error type.

use std::io;

/// Errors produced while encoding or decoding wire data.
///
/// Every variant except [`WireError::Io`] describes malformed or truncated
/// input, i.e. a protocol violation. A message that fails to decode cannot be
/// resynchronized mid-stream and is surfaced to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A text field is longer than the permitted maximum.
    #[error("text length {length} exceeds maximum {max}")]
    TextTooLong {
        /// Length in UTF-16 code units.
        length: usize,
        /// The enforced maximum.
        max: usize,
    },

    /// The stream ended before a field was complete.
    #[error("stream ended before the field was complete")]
    Truncated,

    /// A text field contained an unpaired surrogate.
    #[error("text is not valid UTF-16")]
    InvalidText,

    /// A fixed-width field held a value outside its enumerated range.
    #[error("invalid {field} value: {value}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// The raw value read from the wire.
        value: u64,
    },

    /// A frame named a packet tag that is not in the catalog.
    #[error("unknown packet tag: {0}")]
    UnknownTag(u8),

    /// A payload did not occupy exactly the bytes its frame declared.
    #[error("payload length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch {
        /// Length declared by the frame header.
        declared: usize,
        /// Bytes actually present or consumed.
        actual: usize,
    },

    /// The underlying writer or reader failed for a reason other than EOF.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl WireError {
    /// Returns `true` if this error describes malformed or truncated data
    /// rather than a failure of the underlying stream.
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

impl From<io::Error> for WireError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(err)
        }
    }
}
