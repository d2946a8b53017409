//! Region cell addressing, the authoritative block store interface, and the
//! deferred mutation queue that makes world edits look instantaneous.

pub mod cell;
pub mod deferred;
pub mod notify;
pub mod store;

pub use cell::{
    BlockTypeId, CellIndex, LocalPos, REGION_HEIGHT, REGION_VOLUME, REGION_WIDTH, RegionCoord,
    pack_index, unpack_index,
};
pub use deferred::{DeferredMutationQueue, FlushReport};
pub use notify::{ChangeNotifier, ObserverLookup, RegionBroadcaster, RegionObservers};
pub use store::{BlockStore, MemoryBlockStore};
