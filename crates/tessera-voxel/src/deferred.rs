//! Deferred world mutations.
//!
//! Application code stages cell changes at any point during a tick. Each stage
//! call immediately notifies observing clients of the resulting visible state,
//! then the staged values wait in per-region maps until the tick driver calls
//! [`DeferredMutationQueue::flush`], which commits them to the authoritative
//! [`BlockStore`] in one batch.
//!
//! A second change to the same cell before the flush overwrites the first.
//! Only the last staged type and the last staged metadata reach the store.
//!
//! The queue performs no locking. Every call must come from the tick thread.

use rustc_hash::{FxHashMap, FxHashSet};
use tessera_net::BlockChange;

use crate::cell::{BlockTypeId, CellIndex, LocalPos, RegionCoord};
use crate::notify::ChangeNotifier;
use crate::store::BlockStore;

/// Pending values for one region. Dropped when the region is flushed.
#[derive(Debug, Default)]
struct RegionStaging {
    types: FxHashMap<CellIndex, BlockTypeId>,
    metas: FxHashMap<CellIndex, u8>,
}

impl RegionStaging {
    fn is_empty(&self) -> bool {
        self.types.is_empty() && self.metas.is_empty()
    }
}

/// What one [`DeferredMutationQueue::flush`] committed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Regions that had pending changes.
    pub regions: usize,
    /// Type values written to the store.
    pub type_writes: usize,
    /// Metadata values written to the store.
    pub meta_writes: usize,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.regions == 0
    }
}

/// Per-region staging of cell changes, committed once per tick.
#[derive(Debug, Default)]
pub struct DeferredMutationQueue {
    staging: FxHashMap<RegionCoord, RegionStaging>,
    pending: FxHashSet<RegionCoord>,
}

impl DeferredMutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a new block type for one cell and notifies observers with the
    /// new type and the store's current metadata.
    ///
    /// Returns the number of clients notified.
    pub fn stage_type_change<S, N>(
        &mut self,
        store: &S,
        notifier: &N,
        region: RegionCoord,
        pos: LocalPos,
        block_type: BlockTypeId,
    ) -> usize
    where
        S: BlockStore + ?Sized,
        N: ChangeNotifier + ?Sized,
    {
        let index = pos.index();
        self.region_mut(region).types.insert(index, block_type);
        let meta = store.get_meta(region, index);
        notify(notifier, region, pos, block_type, meta)
    }

    /// Stages new metadata for one cell and notifies observers with the
    /// store's current type and the new metadata.
    pub fn stage_meta_change<S, N>(
        &mut self,
        store: &S,
        notifier: &N,
        region: RegionCoord,
        pos: LocalPos,
        meta: u8,
    ) -> usize
    where
        S: BlockStore + ?Sized,
        N: ChangeNotifier + ?Sized,
    {
        let index = pos.index();
        self.region_mut(region).metas.insert(index, meta);
        let block_type = store.get_type(region, index);
        notify(notifier, region, pos, block_type, meta)
    }

    /// Stages both halves of one cell and notifies observers with them.
    pub fn stage_type_and_meta_change<N>(
        &mut self,
        notifier: &N,
        region: RegionCoord,
        pos: LocalPos,
        block_type: BlockTypeId,
        meta: u8,
    ) -> usize
    where
        N: ChangeNotifier + ?Sized,
    {
        let index = pos.index();
        let staging = self.region_mut(region);
        staging.types.insert(index, block_type);
        staging.metas.insert(index, meta);
        notify(notifier, region, pos, block_type, meta)
    }

    /// Commits every staged value to `store` and releases the staging maps.
    ///
    /// Observers are not notified again. Flushing an empty queue does nothing.
    pub fn flush<S: BlockStore + ?Sized>(&mut self, store: &mut S) -> FlushReport {
        let mut report = FlushReport::default();
        for region in self.pending.drain() {
            let Some(staging) = self.staging.remove(&region) else {
                continue;
            };
            report.regions += 1;
            for (index, block_type) in staging.types {
                store.set_type(region, index, block_type);
                report.type_writes += 1;
            }
            for (index, meta) in staging.metas {
                store.set_meta(region, index, meta);
                report.meta_writes += 1;
            }
        }
        if !report.is_empty() {
            tracing::debug!(
                regions = report.regions,
                type_writes = report.type_writes,
                meta_writes = report.meta_writes,
                "flushed staged block changes"
            );
        }
        report
    }

    /// Returns `true` if `region` has changes waiting for the next flush.
    pub fn is_pending(&self, region: RegionCoord) -> bool {
        self.pending.contains(&region)
    }

    /// Regions with changes waiting for the next flush, in no particular order.
    pub fn pending_regions(&self) -> impl Iterator<Item = RegionCoord> + '_ {
        self.pending.iter().copied()
    }

    /// The type staged for a cell, if any.
    pub fn staged_type(&self, region: RegionCoord, pos: LocalPos) -> Option<BlockTypeId> {
        self.staging
            .get(&region)
            .and_then(|staging| staging.types.get(&pos.index()).copied())
    }

    /// The metadata staged for a cell, if any.
    pub fn staged_meta(&self, region: RegionCoord, pos: LocalPos) -> Option<u8> {
        self.staging
            .get(&region)
            .and_then(|staging| staging.metas.get(&pos.index()).copied())
    }

    /// Number of regions holding staging maps.
    pub fn staged_region_count(&self) -> usize {
        self.staging.len()
    }

    /// Returns `true` if nothing is waiting to be flushed.
    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.pending.len(), self.staging.len());
        debug_assert!(!self.staging.values().any(RegionStaging::is_empty));
        self.pending.is_empty()
    }

    fn region_mut(&mut self, region: RegionCoord) -> &mut RegionStaging {
        self.pending.insert(region);
        self.staging.entry(region).or_default()
    }
}

fn notify<N: ChangeNotifier + ?Sized>(
    notifier: &N,
    region: RegionCoord,
    pos: LocalPos,
    block_type: BlockTypeId,
    meta: u8,
) -> usize {
    let (x, y, z) = region.world_pos(pos);
    let change = BlockChange {
        x,
        y,
        z,
        block_type: block_type.0,
        meta,
    };
    tracing::trace!(?region, x, y, z, block_type = block_type.0, meta, "staged block change");
    notifier.notify(region, &change)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::store::MemoryBlockStore;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: RefCell<Vec<(RegionCoord, BlockChange)>>,
    }

    impl ChangeNotifier for RecordingNotifier {
        fn notify(&self, region: RegionCoord, change: &BlockChange) -> usize {
            self.seen.borrow_mut().push((region, *change));
            1
        }
    }

    fn pos(x: u8, y: u8, z: u8) -> LocalPos {
        LocalPos::new(x, y, z).unwrap()
    }

    #[test]
    fn test_type_change_notifies_with_current_meta() {
        let region = RegionCoord::new(0, 0);
        let mut store = MemoryBlockStore::new();
        store.set_meta(region, pos(1, 2, 3).index(), 7);
        let notifier = RecordingNotifier::default();
        let mut queue = DeferredMutationQueue::new();

        queue.stage_type_change(&store, &notifier, region, pos(1, 2, 3), BlockTypeId(5));

        let seen = notifier.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].1,
            BlockChange {
                x: 1,
                y: 2,
                z: 3,
                block_type: 5,
                meta: 7
            }
        );
        // Not yet committed.
        assert_eq!(store.get_type(region, pos(1, 2, 3).index()), BlockTypeId::AIR);

        drop(seen);
        let report = queue.flush(&mut store);
        assert_eq!(store.get_type(region, pos(1, 2, 3).index()), BlockTypeId(5));
        assert_eq!(store.get_meta(region, pos(1, 2, 3).index()), 7);
        assert_eq!(
            report,
            FlushReport {
                regions: 1,
                type_writes: 1,
                meta_writes: 0
            }
        );
    }

    #[test]
    fn test_meta_change_notifies_with_current_type() {
        let region = RegionCoord::new(-1, 2);
        let mut store = MemoryBlockStore::new();
        store.set_type(region, pos(0, 10, 0).index(), BlockTypeId(3));
        let notifier = RecordingNotifier::default();
        let mut queue = DeferredMutationQueue::new();

        queue.stage_meta_change(&store, &notifier, region, pos(0, 10, 0), 9);

        let change = notifier.seen.borrow()[0].1;
        assert_eq!((change.block_type, change.meta), (3, 9));
        assert_eq!((change.x, change.y, change.z), (-16, 10, 32));
    }

    #[test]
    fn test_unchanged_half_comes_from_store_not_staging() {
        let region = RegionCoord::new(0, 0);
        let store = MemoryBlockStore::new();
        let notifier = RecordingNotifier::default();
        let mut queue = DeferredMutationQueue::new();

        queue.stage_type_change(&store, &notifier, region, pos(4, 4, 4), BlockTypeId(8));
        queue.stage_meta_change(&store, &notifier, region, pos(4, 4, 4), 2);

        let seen = notifier.seen.borrow();
        assert_eq!(seen[1].1.block_type, 0, "staged type must not leak into the meta notification");
        assert_eq!(seen[1].1.meta, 2);
    }

    #[test]
    fn test_last_write_wins() {
        let region = RegionCoord::new(0, 0);
        let mut store = MemoryBlockStore::new();
        let notifier = RecordingNotifier::default();
        let mut queue = DeferredMutationQueue::new();
        let cell = pos(1, 1, 1);

        queue.stage_type_change(&store, &notifier, region, cell, BlockTypeId(1));
        queue.stage_type_change(&store, &notifier, region, cell, BlockTypeId(2));
        queue.stage_type_and_meta_change(&notifier, region, cell, BlockTypeId(3), 4);
        queue.stage_meta_change(&store, &notifier, region, cell, 5);
        assert_eq!(queue.staged_type(region, cell), Some(BlockTypeId(3)));
        assert_eq!(queue.staged_meta(region, cell), Some(5));

        let report = queue.flush(&mut store);
        assert_eq!(report.type_writes, 1);
        assert_eq!(report.meta_writes, 1);
        assert_eq!(store.get_type(region, cell.index()), BlockTypeId(3));
        assert_eq!(store.get_meta(region, cell.index()), 5);
        // One write each: intermediate values never reached the store.
        assert_eq!(store.version(region), 2);
    }

    #[test]
    fn test_pending_set_tracks_staging() {
        let store = MemoryBlockStore::new();
        let notifier = RecordingNotifier::default();
        let mut queue = DeferredMutationQueue::new();
        let a = RegionCoord::new(0, 0);
        let b = RegionCoord::new(5, -5);
        assert!(queue.is_empty());

        queue.stage_type_change(&store, &notifier, a, pos(0, 0, 0), BlockTypeId(1));
        queue.stage_meta_change(&store, &notifier, b, pos(0, 0, 0), 1);
        assert!(queue.is_pending(a));
        assert!(queue.is_pending(b));
        assert!(!queue.is_pending(RegionCoord::new(1, 1)));

        let mut regions: Vec<_> = queue.pending_regions().collect();
        regions.sort();
        assert_eq!(regions, vec![a, b]);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_flush_clears_staging_and_does_not_renotify() {
        let region = RegionCoord::new(3, 3);
        let mut store = MemoryBlockStore::new();
        let notifier = RecordingNotifier::default();
        let mut queue = DeferredMutationQueue::new();

        queue.stage_type_and_meta_change(&notifier, region, pos(2, 2, 2), BlockTypeId(6), 1);
        queue.flush(&mut store);

        assert!(queue.is_empty());
        assert!(!queue.is_pending(region));
        assert_eq!(queue.staged_type(region, pos(2, 2, 2)), None);
        assert_eq!(notifier.seen.borrow().len(), 1);
    }

    #[test]
    fn test_flush_empty_queue_is_noop() {
        let mut store = MemoryBlockStore::new();
        let mut queue = DeferredMutationQueue::new();
        assert!(queue.flush(&mut store).is_empty());
        assert!(queue.flush(&mut store).is_empty());
        assert_eq!(store.region_count(), 0);
    }

    #[test]
    fn test_stage_after_flush_is_pending_again() {
        let region = RegionCoord::new(0, 0);
        let mut store = MemoryBlockStore::new();
        let notifier = RecordingNotifier::default();
        let mut queue = DeferredMutationQueue::new();

        queue.stage_type_change(&store, &notifier, region, pos(0, 0, 0), BlockTypeId(1));
        queue.flush(&mut store);
        queue.stage_type_change(&store, &notifier, region, pos(0, 0, 0), BlockTypeId(2));

        assert!(queue.is_pending(region));
        queue.flush(&mut store);
        assert_eq!(store.get_type(region, pos(0, 0, 0).index()), BlockTypeId(2));
    }

    #[test]
    fn test_flush_releases_staging_for_every_region() {
        let mut store = MemoryBlockStore::new();
        let notifier = RecordingNotifier::default();
        let mut queue = DeferredMutationQueue::new();
        for i in 0..10_000 {
            let region = RegionCoord::new(i % 100, i / 100);
            queue.stage_meta_change(&store, &notifier, region, pos(0, 0, 0), 1);
        }
        assert_eq!(queue.staged_region_count(), 10_000);

        let report = queue.flush(&mut store);
        assert_eq!(report.regions, 10_000);
        assert_eq!(queue.staged_region_count(), 0);
        assert!(queue.is_empty());
        assert_eq!(queue.staged_meta(RegionCoord::new(0, 0), pos(0, 0, 0)), None);
    }
}
