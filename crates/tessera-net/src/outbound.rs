//! The outbound send path: approve, encode, hand off.
//!
//! [`Outbound`] owns the [`InterceptionRegistry`] and a [`Transport`]. Every
//! attempted per-client send is approved individually; a packet is encoded at
//! most once per call no matter how many clients receive it.

use crossbeam_channel::{Receiver, Sender};
use tessera_wire::WireError;

use crate::interception::InterceptionRegistry;
use crate::packet::{Packet, encode_frame};

/// Identifies a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// Fire-and-forget hand-off of encoded frames to a connection layer.
pub trait Transport {
    /// Queues `frame` for delivery to `client`. Must not block on I/O.
    fn send(&self, client: ClientId, frame: Vec<u8>);
}

// ---------------------------------------------------------------------------
// ChannelTransport
// ---------------------------------------------------------------------------

/// A frame addressed to one client.
pub type OutgoingFrame = (ClientId, Vec<u8>);

/// [`Transport`] that pushes frames into a channel drained by the connection
/// layer.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: Sender<OutgoingFrame>,
}

impl ChannelTransport {
    /// Creates a transport over an unbounded channel and returns its receiving end.
    pub fn unbounded() -> (Self, Receiver<OutgoingFrame>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, client: ClientId, frame: Vec<u8>) {
        if self.sender.send((client, frame)).is_err() {
            tracing::warn!(?client, "connection layer has gone away, dropping frame");
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Approves, encodes, and transmits packets.
#[derive(Debug)]
pub struct Outbound<T> {
    gates: InterceptionRegistry,
    transport: T,
}

impl<T: Transport> Outbound<T> {
    /// Creates a send path with an empty interception registry.
    pub fn new(transport: T) -> Self {
        Self::with_gates(InterceptionRegistry::new(), transport)
    }

    /// Creates a send path using an existing registry.
    pub fn with_gates(gates: InterceptionRegistry, transport: T) -> Self {
        Self { gates, transport }
    }

    /// The interception registry consulted before every send.
    pub fn gates(&self) -> &InterceptionRegistry {
        &self.gates
    }

    /// Mutable access for startup/shutdown registration.
    pub fn gates_mut(&mut self) -> &mut InterceptionRegistry {
        &mut self.gates
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `packet` to `client` if the gates approve it.
    ///
    /// Returns `Ok(false)` when a gate refused the packet.
    pub fn send(&self, client: ClientId, packet: &Packet) -> Result<bool, WireError> {
        if !self.gates.approve(packet) {
            tracing::trace!(?client, tag = packet.tag().0, "packet refused by gate");
            return Ok(false);
        }
        let frame = encode_frame(packet)?;
        tracing::trace!(?client, tag = packet.tag().0, len = frame.len(), "sending packet");
        self.transport.send(client, frame);
        Ok(true)
    }

    /// Sends `packet` to every client in `clients`, approving each send
    /// individually. Returns the number of clients the packet was handed to.
    pub fn broadcast<I>(&self, clients: I, packet: &Packet) -> Result<usize, WireError>
    where
        I: IntoIterator<Item = ClientId>,
    {
        let mut frame: Option<Vec<u8>> = None;
        let mut sent = 0;
        for client in clients {
            if !self.gates.approve(packet) {
                tracing::trace!(?client, tag = packet.tag().0, "packet refused by gate");
                continue;
            }
            let encoded = match frame.take() {
                Some(encoded) => encoded,
                None => encode_frame(packet)?,
            };
            self.transport.send(client, encoded.clone());
            frame = Some(encoded);
            sent += 1;
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::entity_title::EntityTitle;
    use crate::packet::{PacketTag, decode_frame};

    #[derive(Default)]
    struct RecordingTransport {
        sent: RefCell<Vec<OutgoingFrame>>,
    }

    impl Transport for RecordingTransport {
        fn send(&self, client: ClientId, frame: Vec<u8>) {
            self.sent.borrow_mut().push((client, frame));
        }
    }

    fn title() -> Packet {
        EntityTitle::new(42, "Boss").into()
    }

    #[test]
    fn test_approved_packet_is_encoded_and_sent() {
        let outbound = Outbound::new(RecordingTransport::default());
        assert!(outbound.send(ClientId(1), &title()).unwrap());

        let sent = outbound.transport().sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ClientId(1));
        assert_eq!(decode_frame(&sent[0].1).unwrap(), title());
    }

    #[test]
    fn test_refused_packet_never_reaches_transport() {
        let mut outbound = Outbound::new(RecordingTransport::default());
        outbound
            .gates_mut()
            .register(PacketTag::ENTITY_TITLE.into(), Arc::new(|_: &Packet| false));

        assert!(!outbound.send(ClientId(1), &title()).unwrap());
        assert!(outbound.transport().sent.borrow().is_empty());
    }

    #[test]
    fn test_broadcast_reaches_every_client() {
        let outbound = Outbound::new(RecordingTransport::default());
        let sent = outbound
            .broadcast([ClientId(1), ClientId(2), ClientId(3)], &title())
            .unwrap();
        assert_eq!(sent, 3);

        let frames = outbound.transport().sent.borrow();
        let clients: Vec<ClientId> = frames.iter().map(|(client, _)| *client).collect();
        assert_eq!(clients, vec![ClientId(1), ClientId(2), ClientId(3)]);
        assert!(frames.iter().all(|(_, frame)| frame == &frames[0].1));
    }

    #[test]
    fn test_broadcast_approves_each_send() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut outbound = Outbound::new(RecordingTransport::default());
        // Refuses every other attempt.
        outbound.gates_mut().register(
            PacketTag::ENTITY_TITLE.into(),
            Arc::new(move |_: &Packet| counter.fetch_add(1, Ordering::SeqCst) % 2 == 0),
        );

        let sent = outbound
            .broadcast((1..=4).map(ClientId), &title())
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(sent, 2);
    }

    #[test]
    fn test_broadcast_to_nobody_sends_nothing() {
        let outbound = Outbound::new(RecordingTransport::default());
        assert_eq!(outbound.broadcast(std::iter::empty(), &title()).unwrap(), 0);
        assert!(outbound.transport().sent.borrow().is_empty());
    }

    #[test]
    fn test_unencodable_packet_surfaces_error() {
        let outbound = Outbound::new(RecordingTransport::default());
        let packet: Packet = EntityTitle::new(1, "x".repeat(40_000)).into();
        let err = outbound.send(ClientId(1), &packet).unwrap_err();
        assert!(matches!(err, WireError::TextTooLong { .. }));
        assert!(outbound.transport().sent.borrow().is_empty());
    }

    #[test]
    fn test_channel_transport_delivers_frames() {
        let (transport, receiver) = ChannelTransport::unbounded();
        let outbound = Outbound::new(transport);
        outbound.send(ClientId(9), &title()).unwrap();

        let (client, frame) = receiver.try_recv().unwrap();
        assert_eq!(client, ClientId(9));
        assert_eq!(decode_frame(&frame).unwrap(), title());
    }

    #[test]
    fn test_channel_transport_survives_dropped_receiver() {
        let (transport, receiver) = ChannelTransport::unbounded();
        drop(receiver);
        let outbound = Outbound::new(transport);
        assert!(outbound.send(ClientId(1), &title()).unwrap());
    }
}
