//! Carriers for serialized overlay widgets.
//!
//! The network layer does not know the widget catalog, so a widget's bytes
//! travel as an opaque length-prefixed payload tagged with its type id.

use std::io::{Read, Write};

use tessera_wire::{WireError, WireRead, WireWrite};
use uuid::Uuid;

use crate::packet::{PacketTag, WireMessage};

/// One serialized widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetUpdate {
    /// Widget type id understood by the GUI layer.
    pub widget_type: u16,
    /// The widget's own serialized form.
    pub payload: Vec<u8>,
}

impl WireMessage for WidgetUpdate {
    const TAG: PacketTag = PacketTag::WIDGET_UPDATE;

    fn num_bytes(&self) -> usize {
        2 + 4 + self.payload.len()
    }

    fn write_data<W: Write + ?Sized>(&self, out: &mut W) -> Result<(), WireError> {
        out.write_u16(self.widget_type)?;
        out.write_u32(self.payload.len() as u32)?;
        out.write_all(&self.payload)?;
        Ok(())
    }

    fn read_data<R: Read + ?Sized>(input: &mut R) -> Result<Self, WireError> {
        let widget_type = input.read_u16()?;
        let declared = input.read_u32()? as usize;

        // Read through `take` so a lying length cannot force a huge allocation.
        let mut payload = Vec::new();
        input.take(declared as u64).read_to_end(&mut payload)?;
        if payload.len() != declared {
            return Err(WireError::Truncated);
        }
        Ok(Self {
            widget_type,
            payload,
        })
    }
}

/// Removal of one widget from the client's screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetRemove {
    /// Identifier of the removed widget.
    pub widget_id: Uuid,
}

impl WireMessage for WidgetRemove {
    const TAG: PacketTag = PacketTag::WIDGET_REMOVE;

    fn num_bytes(&self) -> usize {
        16
    }

    fn write_data<W: Write + ?Sized>(&self, out: &mut W) -> Result<(), WireError> {
        out.write_uuid(self.widget_id)
    }

    fn read_data<R: Read + ?Sized>(input: &mut R) -> Result<Self, WireError> {
        Ok(Self {
            widget_id: input.read_uuid()?,
        })
    }
}
