//! Fixed-width field encoding over [`std::io`] streams.
//!
//! ```text
//! text:    +------------------+------------------------------+
//!          | length (u16 BE)  | UTF-16 code units (u16 BE)   |
//!          +------------------+------------------------------+
//! integer: big-endian, fixed width
//! bool:    one byte, 0 or 1
//! uuid:    u64 BE most-significant half, then u64 BE least-significant half
//! ```
//!
//! The length prefix of a text field counts UTF-16 code units, not bytes, so
//! `size_of_text(text) == 2 + 2 * units`.

use std::io::{Read, Write};

use uuid::Uuid;

use crate::error::WireError;

/// Largest text length (in UTF-16 code units) that fits a signed 16-bit prefix.
pub const MAX_TEXT_LENGTH: usize = 32_767;

/// Returns the exact number of bytes [`WireWrite::write_text`] emits for `text`.
pub fn size_of_text(text: &str) -> usize {
    2 + 2 * text.encode_utf16().count()
}

/// Encoding helpers available on every [`Write`] implementation, including
/// `dyn Write`.
pub trait WireWrite: Write {
    /// Writes one unsigned byte.
    fn write_u8(&mut self, value: u8) -> Result<(), WireError> {
        self.write_all(&[value])?;
        Ok(())
    }

    /// Writes one signed byte.
    fn write_i8(&mut self, value: i8) -> Result<(), WireError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a boolean as a single `0` or `1` byte.
    fn write_bool(&mut self, value: bool) -> Result<(), WireError> {
        self.write_u8(u8::from(value))
    }

    /// Writes a big-endian `u16`.
    fn write_u16(&mut self, value: u16) -> Result<(), WireError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a big-endian `i16`.
    fn write_i16(&mut self, value: i16) -> Result<(), WireError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a big-endian `u32`.
    fn write_u32(&mut self, value: u32) -> Result<(), WireError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a big-endian `i32`.
    fn write_i32(&mut self, value: i32) -> Result<(), WireError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a big-endian `u64`.
    fn write_u64(&mut self, value: u64) -> Result<(), WireError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a big-endian `i64`.
    fn write_i64(&mut self, value: i64) -> Result<(), WireError> {
        self.write_all(&value.to_be_bytes())?;
        Ok(())
    }

    /// Writes a 128-bit identifier, most-significant half first.
    fn write_uuid(&mut self, id: Uuid) -> Result<(), WireError> {
        let bits = id.as_u128();
        self.write_u64((bits >> 64) as u64)?;
        self.write_u64(bits as u64)
    }

    /// Writes a length-prefixed UTF-16 text field.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::TextTooLong`] if `text` has more than
    /// [`MAX_TEXT_LENGTH`] UTF-16 code units.
    fn write_text(&mut self, text: &str) -> Result<(), WireError> {
        let length = text.encode_utf16().count();
        if length > MAX_TEXT_LENGTH {
            return Err(WireError::TextTooLong {
                length,
                max: MAX_TEXT_LENGTH,
            });
        }

        let mut buf = Vec::with_capacity(2 + 2 * length);
        buf.extend_from_slice(&(length as u16).to_be_bytes());
        for unit in text.encode_utf16() {
            buf.extend_from_slice(&unit.to_be_bytes());
        }
        self.write_all(&buf)?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WireWrite for W {}

/// Decoding helpers available on every [`Read`] implementation, including
/// `dyn Read`.
///
/// Every method maps an early end of stream to [`WireError::Truncated`].
pub trait WireRead: Read {
    /// Reads exactly `N` bytes.
    fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads one unsigned byte.
    fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.read_fixed::<1>()?[0])
    }

    /// Reads one signed byte.
    fn read_i8(&mut self) -> Result<i8, WireError> {
        Ok(i8::from_be_bytes(self.read_fixed()?))
    }

    /// Reads a boolean. Any byte other than `0` or `1` is a protocol violation.
    fn read_bool(&mut self) -> Result<bool, WireError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidValue {
                field: "bool",
                value: u64::from(other),
            }),
        }
    }

    /// Reads a big-endian `u16`.
    fn read_u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_be_bytes(self.read_fixed()?))
    }

    /// Reads a big-endian `i16`.
    fn read_i16(&mut self) -> Result<i16, WireError> {
        Ok(i16::from_be_bytes(self.read_fixed()?))
    }

    /// Reads a big-endian `u32`.
    fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(self.read_fixed()?))
    }

    /// Reads a big-endian `i32`.
    fn read_i32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_be_bytes(self.read_fixed()?))
    }

    /// Reads a big-endian `u64`.
    fn read_u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_be_bytes(self.read_fixed()?))
    }

    /// Reads a big-endian `i64`.
    fn read_i64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_be_bytes(self.read_fixed()?))
    }

    /// Reads a 128-bit identifier written by [`WireWrite::write_uuid`].
    fn read_uuid(&mut self) -> Result<Uuid, WireError> {
        let high = u128::from(self.read_u64()?);
        let low = u128::from(self.read_u64()?);
        Ok(Uuid::from_u128((high << 64) | low))
    }

    /// Reads a length-prefixed UTF-16 text field of at most `max_len` code units.
    ///
    /// # Errors
    ///
    /// - [`WireError::TextTooLong`] if the declared length exceeds `max_len`.
    /// - [`WireError::Truncated`] if the stream ends before the declared length.
    /// - [`WireError::InvalidText`] if the code units are not valid UTF-16.
    fn read_text(&mut self, max_len: usize) -> Result<String, WireError> {
        let length = usize::from(self.read_u16()?);
        if length > max_len {
            return Err(WireError::TextTooLong {
                length,
                max: max_len,
            });
        }

        let mut raw = vec![0u8; length * 2];
        self.read_exact(&mut raw)?;
        let units = raw
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        char::decode_utf16(units)
            .collect::<Result<String, _>>()
            .map_err(|_| WireError::InvalidText)
    }
}

impl<R: Read + ?Sized> WireRead for R {}
