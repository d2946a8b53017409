//! Single-cell world change notification.

use std::io::{Read, Write};

use tessera_wire::{WireError, WireRead, WireWrite};

use crate::packet::{PacketTag, WireMessage};

/// Tells a client that the cell at a world position now shows the given type
/// and metadata. Always carries the complete final pair, never a partial one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockChange {
    /// World X.
    pub x: i32,
    /// World Y.
    pub y: i32,
    /// World Z.
    pub z: i32,
    /// Block type id.
    pub block_type: u16,
    /// Block metadata byte.
    pub meta: u8,
}

impl WireMessage for BlockChange {
    const TAG: PacketTag = PacketTag::BLOCK_CHANGE;

    fn num_bytes(&self) -> usize {
        4 + 4 + 4 + 2 + 1
    }

    fn write_data<W: Write + ?Sized>(&self, out: &mut W) -> Result<(), WireError> {
        out.write_i32(self.x)?;
        out.write_i32(self.y)?;
        out.write_i32(self.z)?;
        out.write_u16(self.block_type)?;
        out.write_u8(self.meta)
    }

    fn read_data<R: Read + ?Sized>(input: &mut R) -> Result<Self, WireError> {
        Ok(Self {
            x: input.read_i32()?,
            y: input.read_i32()?,
            z: input.read_i32()?,
            block_type: input.read_u16()?,
            meta: input.read_u8()?,
        })
    }
}
