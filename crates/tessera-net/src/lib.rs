//! Packet catalog, outbound interception pipeline, and stream framing for the
//! client synchronization layer.
//!
//! Every outgoing [`Packet`] passes through an [`InterceptionRegistry`] before
//! it is encoded and handed to a [`Transport`].

pub mod block_change;
pub mod entity_title;
pub mod framing;
pub mod interception;
pub mod outbound;
pub mod packet;
pub mod widget;

pub use block_change::BlockChange;
pub use entity_title::{EntityLabels, EntityTitle, RESET_TITLE};
pub use framing::{FrameConfig, FrameError, read_frame, write_frame};
pub use interception::{InterceptionRegistry, PacketGate, TAG_SLOTS};
pub use outbound::{ChannelTransport, ClientId, OutgoingFrame, Outbound, Transport};
pub use packet::{FRAME_HEADER_LEN, Packet, PacketTag, WireMessage, decode_frame, encode_frame};
pub use widget::{WidgetRemove, WidgetUpdate};
