//! End-to-end flow: server-side mutations, gates, and ticks observed by a
//! client that decodes every frame it receives.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tessera_gui::{Label, RenderPriority, Screen, ScreenId, Texture, Widget};
use tessera_net::{
    BlockChange, ChannelTransport, ClientId, EntityLabels, OutgoingFrame, Packet, PacketGate,
    PacketTag, decode_frame,
};
use tessera_server::SyncServer;
use tessera_voxel::{BlockStore, BlockTypeId, LocalPos, MemoryBlockStore, RegionCoord};

/// What one client has been told so far.
struct ClientView {
    id: ClientId,
    screen: Screen,
    labels: EntityLabels,
    blocks: HashMap<(i32, i32, i32), (u16, u8)>,
}

impl ClientView {
    fn new(id: ClientId) -> Self {
        Self {
            id,
            screen: Screen::new(ScreenId(id.0)),
            labels: EntityLabels::new(),
            blocks: HashMap::new(),
        }
    }

    fn apply(&mut self, packet: Packet) {
        match packet {
            Packet::BlockChange(change) => {
                self.blocks
                    .insert((change.x, change.y, change.z), (change.block_type, change.meta));
            }
            Packet::EntityTitle(title) => {
                self.labels.apply(&title);
            }
            Packet::WidgetUpdate(update) => {
                self.screen.apply_update(&update).unwrap();
            }
            Packet::WidgetRemove(remove) => {
                self.screen.apply_remove(&remove);
            }
        }
    }
}

/// Delivers every queued frame to its addressee and returns how many frames
/// were delivered.
fn deliver(frames: &Receiver<OutgoingFrame>, clients: &mut [&mut ClientView]) -> usize {
    let mut delivered = 0;
    for (client, frame) in frames.try_iter() {
        let packet = decode_frame(&frame).unwrap();
        let view = clients
            .iter_mut()
            .find(|view| view.id == client)
            .expect("frame addressed to unknown client");
        view.apply(packet);
        delivered += 1;
    }
    delivered
}

fn pos(x: u8, y: u8, z: u8) -> LocalPos {
    LocalPos::new(x, y, z).unwrap()
}

#[test]
fn test_type_change_shows_current_meta_and_commits_on_tick() {
    let (transport, frames) = ChannelTransport::unbounded();
    let mut store = MemoryBlockStore::new();
    let region = RegionCoord::new(0, 0);
    let cell = pos(1, 2, 3);
    store.set_meta(region, cell.index(), 7);

    let mut server = SyncServer::new(transport, store);
    let mut alice = ClientView::new(ClientId(1));
    let mut bob = ClientView::new(ClientId(2));
    let mut carol = ClientView::new(ClientId(3));
    server.observers_mut().observe(region, alice.id);
    server.observers_mut().observe(region, bob.id);
    server
        .observers_mut()
        .observe(RegionCoord::new(1, 0), carol.id);

    assert_eq!(server.set_block_type(region, cell, BlockTypeId(5)), 2);
    assert_eq!(deliver(&frames, &mut [&mut alice, &mut bob, &mut carol]), 2);
    assert_eq!(alice.blocks[&(1, 2, 3)], (5, 7));
    assert_eq!(bob.blocks[&(1, 2, 3)], (5, 7));
    assert!(carol.blocks.is_empty());

    // Visible to clients, not yet authoritative.
    assert_eq!(server.store().get_type(region, cell.index()), BlockTypeId::AIR);

    let report = server.tick();
    assert_eq!(report.flush.regions, 1);
    assert_eq!(server.store().get_type(region, cell.index()), BlockTypeId(5));
    assert_eq!(server.store().get_meta(region, cell.index()), 7);
    // The flush itself sends nothing.
    assert_eq!(deliver(&frames, &mut [&mut alice, &mut bob, &mut carol]), 0);
}

#[test]
fn test_last_write_wins_within_a_tick() {
    let (transport, frames) = ChannelTransport::unbounded();
    let mut server = SyncServer::new(transport, MemoryBlockStore::new());
    let region = RegionCoord::new(-2, 3);
    let cell = pos(15, 127, 0);
    let mut view = ClientView::new(ClientId(1));
    server.observers_mut().observe(region, view.id);

    server.set_block(region, cell, BlockTypeId(1), 1);
    server.set_block(region, cell, BlockTypeId(2), 2);
    server.set_block_type(region, cell, BlockTypeId(3));
    assert_eq!(deliver(&frames, &mut [&mut view]), 3);

    server.tick();
    assert_eq!(server.store().get_type(region, cell.index()), BlockTypeId(3));
    assert_eq!(server.store().get_meta(region, cell.index()), 2);
    assert_eq!(server.store().version(region), 2);

    let (x, y, z) = region.world_pos(cell);
    assert_eq!((x, y, z), (-17, 127, 48));
    // The last notification paired the new type with the committed meta at
    // stage time, which was still 0.
    assert_eq!(view.blocks[&(x, y, z)], (3, 0));
    assert!(server.queue().is_empty());
}

#[test]
fn test_gate_hides_block_changes_without_blocking_commit() {
    let (transport, frames) = ChannelTransport::unbounded();
    let mut server = SyncServer::new(transport, MemoryBlockStore::new());
    let region = RegionCoord::new(0, 0);
    let mut view = ClientView::new(ClientId(1));
    server.observers_mut().observe(region, view.id);

    // Hide bedrock (type 7) from clients.
    let gate: Arc<dyn PacketGate> = Arc::new(|packet: &Packet| {
        !matches!(packet, Packet::BlockChange(BlockChange { block_type: 7, .. }))
    });
    server
        .gates_mut()
        .register(PacketTag::BLOCK_CHANGE.into(), gate.clone());

    assert_eq!(server.set_block_type(region, pos(0, 0, 0), BlockTypeId(7)), 0);
    assert_eq!(server.set_block_type(region, pos(1, 0, 0), BlockTypeId(4)), 1);
    deliver(&frames, &mut [&mut view]);
    assert_eq!(view.blocks.len(), 1);

    server.tick();
    assert_eq!(
        server.store().get_type(region, pos(0, 0, 0).index()),
        BlockTypeId(7)
    );

    assert!(server.gates_mut().unregister(PacketTag::BLOCK_CHANGE.into(), &gate));
    assert_eq!(server.set_block_type(region, pos(2, 0, 0), BlockTypeId(7)), 1);
}

#[test]
fn test_widgets_and_labels_mirror_on_the_client() {
    let (transport, frames) = ChannelTransport::unbounded();
    let mut server = SyncServer::new(transport, MemoryBlockStore::new());
    let mut alice = ClientView::new(ClientId(1));
    let mut bob = ClientView::new(ClientId(2));

    let screen = server.connect(alice.id);
    let mut health = Label::new("HP 20");
    health
        .set_priority(RenderPriority::Overlay)
        .set_upper_right_x(-4);
    let health = screen.attach(Box::new(health));
    let logo = screen.attach(Box::new(Texture::new("http://example.com/logo.png")));
    server.connect(bob.id);

    server.set_entity_title(42, "Boss").unwrap();
    server.tick();
    deliver(&frames, &mut [&mut alice, &mut bob]);

    assert_eq!(alice.screen.len(), 2);
    assert!(bob.screen.is_empty());
    assert_eq!(alice.labels.get(42), Some("Boss"));
    assert_eq!(bob.labels.get(42), Some("Boss"));
    let order: Vec<_> = alice.screen.render_order().iter().map(|w| w.id()).collect();
    assert_eq!(order, vec![logo, health]);

    // Change one widget, drop the other, clear the label.
    let screen = server.screen_mut(alice.id).unwrap();
    screen.widget_mut(health).unwrap().base_mut().shift_x_pos(-10);
    screen.remove(logo);
    server.clear_entity_title(42).unwrap();

    let report = server.tick();
    assert_eq!(report.widget_updates, 1);
    assert_eq!(report.widget_removals, 1);
    deliver(&frames, &mut [&mut alice, &mut bob]);

    assert_eq!(alice.screen.len(), 1);
    assert_eq!(
        alice.screen.widget(health).unwrap().base().upper_right_x(),
        -14
    );
    assert!(alice.labels.is_empty());
    assert!(bob.labels.is_empty());

    // Nothing left to send.
    assert_eq!(server.tick().widget_updates, 0);
    assert_eq!(deliver(&frames, &mut [&mut alice, &mut bob]), 0);
}
