//! Primitive wire codec shared by every synchronized message: length-prefixed
//! UTF-16 text, fixed-width big-endian integers, and 128-bit identifiers.
//!
//! No variable-length integer encoding is used anywhere, so the encoded size of
//! a message can always be computed before it is written.

mod codec;
mod error;

pub use codec::{MAX_TEXT_LENGTH, WireRead, WireWrite, size_of_text};
pub use error::WireError;
