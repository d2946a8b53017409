//! The packet catalog and the in-memory frame format.
//!
//! ```text
//! +-----------+----------------------+---------------------+
//! | tag (u8)  | payload len (u32 BE) |   payload           |
//! +-----------+----------------------+---------------------+
//! ```
//!
//! The payload length always equals [`Packet::num_bytes`], so a frame can be
//! allocated exactly before anything is written.

use std::io::{Read, Write};

use tessera_wire::{WireError, WireRead, WireWrite};

use crate::block_change::BlockChange;
use crate::entity_title::EntityTitle;
use crate::widget::{WidgetRemove, WidgetUpdate};

/// Bytes preceding the payload in every frame.
pub const FRAME_HEADER_LEN: usize = 5;

// ---------------------------------------------------------------------------
// PacketTag
// ---------------------------------------------------------------------------

/// Message-type tag. The tag space is exactly 256 values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketTag(pub u8);

impl PacketTag {
    /// Single-cell world change notification.
    pub const BLOCK_CHANGE: Self = Self(53);
    /// Entity label update or removal.
    pub const ENTITY_TITLE: Self = Self(200);
    /// Serialized overlay widget.
    pub const WIDGET_UPDATE: Self = Self(201);
    /// Overlay widget removal.
    pub const WIDGET_REMOVE: Self = Self(202);
}

impl From<PacketTag> for i32 {
    fn from(tag: PacketTag) -> Self {
        i32::from(tag.0)
    }
}

// ---------------------------------------------------------------------------
// WireMessage
// ---------------------------------------------------------------------------

/// A message with a fixed tag and an exactly computable encoded size.
///
/// Implementations must guarantee that [`num_bytes`](Self::num_bytes) equals
/// the number of bytes [`write_data`](Self::write_data) emits, and that
/// [`read_data`](Self::read_data) is its exact inverse.
pub trait WireMessage: Sized {
    /// Catalog tag for this message type.
    const TAG: PacketTag;

    /// Encoded payload size in bytes.
    fn num_bytes(&self) -> usize;

    /// Writes the payload.
    fn write_data<W: Write + ?Sized>(&self, out: &mut W) -> Result<(), WireError>;

    /// Reads a payload written by [`write_data`](Self::write_data).
    fn read_data<R: Read + ?Sized>(input: &mut R) -> Result<Self, WireError>;
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Every message the synchronization layer can put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// A cell's visible type/metadata changed.
    BlockChange(BlockChange),
    /// An entity label was set or cleared.
    EntityTitle(EntityTitle),
    /// An overlay widget's state changed.
    WidgetUpdate(WidgetUpdate),
    /// An overlay widget was removed from its screen.
    WidgetRemove(WidgetRemove),
}

impl Packet {
    /// Returns the catalog tag of the contained message.
    pub fn tag(&self) -> PacketTag {
        match self {
            Self::BlockChange(_) => BlockChange::TAG,
            Self::EntityTitle(_) => EntityTitle::TAG,
            Self::WidgetUpdate(_) => WidgetUpdate::TAG,
            Self::WidgetRemove(_) => WidgetRemove::TAG,
        }
    }

    /// Encoded payload size in bytes, excluding the frame header.
    pub fn num_bytes(&self) -> usize {
        match self {
            Self::BlockChange(msg) => msg.num_bytes(),
            Self::EntityTitle(msg) => msg.num_bytes(),
            Self::WidgetUpdate(msg) => msg.num_bytes(),
            Self::WidgetRemove(msg) => msg.num_bytes(),
        }
    }

    /// Writes the payload of the contained message.
    pub fn write_data<W: Write + ?Sized>(&self, out: &mut W) -> Result<(), WireError> {
        match self {
            Self::BlockChange(msg) => msg.write_data(out),
            Self::EntityTitle(msg) => msg.write_data(out),
            Self::WidgetUpdate(msg) => msg.write_data(out),
            Self::WidgetRemove(msg) => msg.write_data(out),
        }
    }

    /// Reads the payload of a message identified by `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownTag`] if `tag` is not in the catalog.
    pub fn read_data<R: Read + ?Sized>(tag: PacketTag, input: &mut R) -> Result<Self, WireError> {
        match tag {
            PacketTag::BLOCK_CHANGE => BlockChange::read_data(input).map(Self::BlockChange),
            PacketTag::ENTITY_TITLE => EntityTitle::read_data(input).map(Self::EntityTitle),
            PacketTag::WIDGET_UPDATE => WidgetUpdate::read_data(input).map(Self::WidgetUpdate),
            PacketTag::WIDGET_REMOVE => WidgetRemove::read_data(input).map(Self::WidgetRemove),
            PacketTag(other) => Err(WireError::UnknownTag(other)),
        }
    }
}

impl From<BlockChange> for Packet {
    fn from(msg: BlockChange) -> Self {
        Self::BlockChange(msg)
    }
}

impl From<EntityTitle> for Packet {
    fn from(msg: EntityTitle) -> Self {
        Self::EntityTitle(msg)
    }
}

impl From<WidgetUpdate> for Packet {
    fn from(msg: WidgetUpdate) -> Self {
        Self::WidgetUpdate(msg)
    }
}

impl From<WidgetRemove> for Packet {
    fn from(msg: WidgetRemove) -> Self {
        Self::WidgetRemove(msg)
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Encodes `packet` as a complete frame (header plus payload).
pub fn encode_frame(packet: &Packet) -> Result<Vec<u8>, WireError> {
    let payload_len = packet.num_bytes();
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload_len);
    out.write_u8(packet.tag().0)?;
    out.write_u32(payload_len as u32)?;
    packet.write_data(&mut out)?;
    debug_assert_eq!(
        out.len(),
        FRAME_HEADER_LEN + payload_len,
        "num_bytes disagrees with write_data for tag {:?}",
        packet.tag()
    );
    Ok(out)
}

/// Decodes a complete frame produced by [`encode_frame`].
///
/// # Errors
///
/// Returns a protocol violation if the header is short, the payload is shorter
/// or longer than declared, or the payload does not decode to exactly the
/// declared number of bytes.
pub fn decode_frame(frame: &[u8]) -> Result<Packet, WireError> {
    let mut input = frame;
    let tag = PacketTag(input.read_u8()?);
    let declared = input.read_u32()? as usize;
    if input.len() < declared {
        return Err(WireError::Truncated);
    }
    if input.len() > declared {
        return Err(WireError::LengthMismatch {
            declared,
            actual: input.len(),
        });
    }
    decode_payload(tag, input)
}

/// Decodes a payload whose tag and length are already known, requiring the
/// decoder to consume every byte.
pub(crate) fn decode_payload(tag: PacketTag, payload: &[u8]) -> Result<Packet, WireError> {
    let mut body = payload;
    let packet = Packet::read_data(tag, &mut body)?;
    if !body.is_empty() {
        return Err(WireError::LengthMismatch {
            declared: payload.len(),
            actual: payload.len() - body.len(),
        });
    }
    Ok(packet)
}
