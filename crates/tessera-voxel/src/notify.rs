//! Delivery of cell change notifications to the clients observing a region.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tessera_net::{BlockChange, ClientId, Outbound, Packet, Transport};

use crate::cell::RegionCoord;

/// Receives a notification for every staged cell change.
pub trait ChangeNotifier {
    /// Delivers `change` to whoever observes `region`. Returns how many
    /// clients the change was handed to.
    fn notify(&self, region: RegionCoord, change: &BlockChange) -> usize;
}

/// Answers which clients currently observe a region.
pub trait ObserverLookup {
    fn observers(&self, region: RegionCoord) -> Vec<ClientId>;
}

// ---------------------------------------------------------------------------
// RegionObservers
// ---------------------------------------------------------------------------

/// Region to observing-clients table.
#[derive(Debug, Clone, Default)]
pub struct RegionObservers {
    regions: FxHashMap<RegionCoord, BTreeSet<ClientId>>,
}

impl RegionObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts sending `region`'s changes to `client`. Returns `false` if it
    /// was already observing.
    pub fn observe(&mut self, region: RegionCoord, client: ClientId) -> bool {
        self.regions.entry(region).or_default().insert(client)
    }

    /// Stops sending `region`'s changes to `client`.
    pub fn forget(&mut self, region: RegionCoord, client: ClientId) -> bool {
        let Some(clients) = self.regions.get_mut(&region) else {
            return false;
        };
        let removed = clients.remove(&client);
        if clients.is_empty() {
            self.regions.remove(&region);
        }
        removed
    }

    /// Removes `client` from every region, e.g. on disconnect.
    pub fn forget_client(&mut self, client: ClientId) {
        self.regions.retain(|_, clients| {
            clients.remove(&client);
            !clients.is_empty()
        });
    }

    pub fn is_observing(&self, region: RegionCoord, client: ClientId) -> bool {
        self.regions
            .get(&region)
            .is_some_and(|clients| clients.contains(&client))
    }
}

impl ObserverLookup for RegionObservers {
    fn observers(&self, region: RegionCoord) -> Vec<ClientId> {
        self.regions
            .get(&region)
            .map(|clients| clients.iter().copied().collect())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// RegionBroadcaster
// ---------------------------------------------------------------------------

/// [`ChangeNotifier`] that broadcasts a [`BlockChange`] packet to every
/// observer of the region through the outbound send path.
#[derive(Debug)]
pub struct RegionBroadcaster<'a, L: ?Sized, T> {
    observers: &'a L,
    outbound: &'a Outbound<T>,
}

impl<'a, L: ObserverLookup + ?Sized, T: Transport> RegionBroadcaster<'a, L, T> {
    pub fn new(observers: &'a L, outbound: &'a Outbound<T>) -> Self {
        Self {
            observers,
            outbound,
        }
    }
}

impl<L: ObserverLookup + ?Sized, T: Transport> ChangeNotifier for RegionBroadcaster<'_, L, T> {
    fn notify(&self, region: RegionCoord, change: &BlockChange) -> usize {
        let clients = self.observers.observers(region);
        if clients.is_empty() {
            return 0;
        }
        let packet = Packet::from(*change);
        match self.outbound.broadcast(clients, &packet) {
            Ok(sent) => sent,
            Err(error) => {
                tracing::warn!(?region, %error, "failed to encode block change");
                0
            }
        }
    }
}
