//! The server-side synchronization driver.

use std::collections::BTreeMap;

use tessera_gui::{Screen, ScreenId};
use tessera_net::{ClientId, EntityTitle, InterceptionRegistry, Outbound, Packet, Transport};
use tessera_voxel::{
    BlockStore, BlockTypeId, DeferredMutationQueue, FlushReport, LocalPos, RegionBroadcaster,
    RegionCoord, RegionObservers,
};
use tessera_wire::WireError;

/// Outcome of one [`SyncServer::tick`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Block changes committed to the store.
    pub flush: FlushReport,
    /// Widget updates handed to the transport.
    pub widget_updates: usize,
    /// Widget removals handed to the transport.
    pub widget_removals: usize,
    /// Widget packets stopped by a gate.
    pub refused: usize,
    /// Dirty widgets that could not be serialized and were not sent.
    pub widget_errors: usize,
}

/// Owns every piece of synchronization state for one world.
///
/// All methods must be called from the tick thread.
#[derive(Debug)]
pub struct SyncServer<T, S> {
    outbound: Outbound<T>,
    store: S,
    queue: DeferredMutationQueue,
    observers: RegionObservers,
    screens: BTreeMap<ClientId, Screen>,
}

impl<T: Transport, S: BlockStore> SyncServer<T, S> {
    pub fn new(transport: T, store: S) -> Self {
        Self::with_gates(InterceptionRegistry::new(), transport, store)
    }

    /// Creates a server whose send path uses an already-populated registry.
    pub fn with_gates(gates: InterceptionRegistry, transport: T, store: S) -> Self {
        Self {
            outbound: Outbound::with_gates(gates, transport),
            store,
            queue: DeferredMutationQueue::new(),
            observers: RegionObservers::new(),
            screens: BTreeMap::new(),
        }
    }

    pub fn outbound(&self) -> &Outbound<T> {
        &self.outbound
    }

    /// Packet gates. Register and unregister only at startup or shutdown.
    pub fn gates_mut(&mut self) -> &mut InterceptionRegistry {
        self.outbound.gates_mut()
    }

    /// The authoritative store. Staged changes are not visible here until the
    /// next [`tick`](Self::tick).
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn queue(&self) -> &DeferredMutationQueue {
        &self.queue
    }

    pub fn observers(&self) -> &RegionObservers {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> &mut RegionObservers {
        &mut self.observers
    }

    // -- clients ----------------------------------------------------------

    /// Registers `client` and gives it an empty screen.
    pub fn connect(&mut self, client: ClientId) -> &mut Screen {
        tracing::debug!(?client, "client connected");
        self.screens
            .entry(client)
            .or_insert_with(|| Screen::new(ScreenId(client.0)))
    }

    /// Drops `client`'s screen and region subscriptions.
    pub fn disconnect(&mut self, client: ClientId) -> Option<Screen> {
        self.observers.forget_client(client);
        let screen = self.screens.remove(&client);
        if screen.is_some() {
            tracing::debug!(?client, "client disconnected");
        }
        screen
    }

    pub fn is_connected(&self, client: ClientId) -> bool {
        self.screens.contains_key(&client)
    }

    /// Connected clients in ascending id order.
    pub fn clients(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.screens.keys().copied()
    }

    pub fn screen(&self, client: ClientId) -> Option<&Screen> {
        self.screens.get(&client)
    }

    pub fn screen_mut(&mut self, client: ClientId) -> Option<&mut Screen> {
        self.screens.get_mut(&client)
    }

    // -- world mutation ---------------------------------------------------

    /// Changes a cell's block type. Observers see it immediately; the store
    /// is updated on the next tick. Returns the number of clients notified.
    pub fn set_block_type(
        &mut self,
        region: RegionCoord,
        pos: LocalPos,
        block_type: BlockTypeId,
    ) -> usize {
        let notifier = RegionBroadcaster::new(&self.observers, &self.outbound);
        self.queue
            .stage_type_change(&self.store, &notifier, region, pos, block_type)
    }

    /// Changes a cell's metadata.
    pub fn set_block_meta(&mut self, region: RegionCoord, pos: LocalPos, meta: u8) -> usize {
        let notifier = RegionBroadcaster::new(&self.observers, &self.outbound);
        self.queue
            .stage_meta_change(&self.store, &notifier, region, pos, meta)
    }

    /// Changes a cell's type and metadata together.
    pub fn set_block(
        &mut self,
        region: RegionCoord,
        pos: LocalPos,
        block_type: BlockTypeId,
        meta: u8,
    ) -> usize {
        let notifier = RegionBroadcaster::new(&self.observers, &self.outbound);
        self.queue
            .stage_type_and_meta_change(&notifier, region, pos, block_type, meta)
    }

    /// [`set_block`](Self::set_block) addressed by world coordinates.
    ///
    /// Returns `None` without staging anything if `y` is outside the region.
    pub fn set_block_at(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        block_type: BlockTypeId,
        meta: u8,
    ) -> Option<usize> {
        let (region, pos) = RegionCoord::split_world(x, y, z)?;
        Some(self.set_block(region, pos, block_type, meta))
    }

    // -- entity labels ----------------------------------------------------

    /// Shows `title` above `entity_id` for every connected client.
    ///
    /// Returns the number of clients the label was sent to.
    pub fn set_entity_title(
        &self,
        entity_id: i32,
        title: impl Into<String>,
    ) -> Result<usize, WireError> {
        self.broadcast(&EntityTitle::new(entity_id, title).into())
    }

    /// Removes the label above `entity_id` for every connected client.
    pub fn clear_entity_title(&self, entity_id: i32) -> Result<usize, WireError> {
        self.broadcast(&EntityTitle::reset(entity_id).into())
    }

    /// Sends `packet` to every connected client.
    pub fn broadcast(&self, packet: &Packet) -> Result<usize, WireError> {
        self.outbound.broadcast(self.clients(), packet)
    }

    // -- tick -------------------------------------------------------------

    /// Commits staged block changes, then sends each screen's pending widget
    /// removals and dirty widgets to its owner.
    ///
    /// A widget that fails to serialize is counted in
    /// [`TickReport::widget_errors`] and left unsent until it changes again.
    /// It never holds back other widgets or removals.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            flush: self.queue.flush(&mut self.store),
            ..TickReport::default()
        };

        for (&client, screen) in &mut self.screens {
            let flush = screen.flush_dirty();
            report.widget_errors += flush.rejected.len();
            for remove in flush.removals {
                match self.outbound.send(client, &remove.into()) {
                    Ok(true) => report.widget_removals += 1,
                    Ok(false) => report.refused += 1,
                    Err(error) => tracing::warn!(?client, %error, "failed to send widget removal"),
                }
            }
            for update in flush.updates {
                match self.outbound.send(client, &update.into()) {
                    Ok(true) => report.widget_updates += 1,
                    Ok(false) => report.refused += 1,
                    Err(error) => tracing::warn!(?client, %error, "failed to send widget update"),
                }
            }
        }

        if report.widget_updates + report.widget_removals + report.widget_errors > 0 {
            tracing::debug!(
                updates = report.widget_updates,
                removals = report.widget_removals,
                refused = report.refused,
                errors = report.widget_errors,
                "sent widget changes"
            );
        }
        report
    }
}
