//! The authoritative per-region block store.
//!
//! [`BlockStore`] is the narrow interface the mutation queue consumes: read the
//! current type or metadata of a cell, and write staged values at flush time.
//! [`MemoryBlockStore`] keeps regions in memory and allocates them on first
//! write.

use rustc_hash::FxHashMap;

use crate::cell::{BlockTypeId, CellIndex, REGION_VOLUME, RegionCoord};

/// Authoritative storage of block types and metadata.
///
/// The store accepts any in-range index, type, and metadata value, so writes
/// are infallible.
pub trait BlockStore {
    fn get_type(&self, region: RegionCoord, index: CellIndex) -> BlockTypeId;

    fn get_meta(&self, region: RegionCoord, index: CellIndex) -> u8;

    fn set_type(&mut self, region: RegionCoord, index: CellIndex, block_type: BlockTypeId);

    fn set_meta(&mut self, region: RegionCoord, index: CellIndex, meta: u8);
}

/// Flat storage for one region.
#[derive(Debug, Clone)]
struct RegionCells {
    types: Box<[u16]>,
    metas: Box<[u8]>,
    version: u64,
}

impl RegionCells {
    fn new() -> Self {
        Self {
            types: vec![BlockTypeId::AIR.0; REGION_VOLUME].into_boxed_slice(),
            metas: vec![0; REGION_VOLUME].into_boxed_slice(),
            version: 0,
        }
    }
}

/// In-memory [`BlockStore`]. Unallocated regions read as air with metadata 0.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    regions: FxHashMap<RegionCoord, RegionCells>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `region` has been written to.
    pub fn is_allocated(&self, region: RegionCoord) -> bool {
        self.regions.contains_key(&region)
    }

    /// Number of allocated regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Number of writes applied to `region`, or 0 if it was never written.
    pub fn version(&self, region: RegionCoord) -> u64 {
        self.regions.get(&region).map_or(0, |cells| cells.version)
    }

    fn cells_mut(&mut self, region: RegionCoord) -> &mut RegionCells {
        self.regions.entry(region).or_insert_with(|| {
            tracing::trace!(?region, "allocating region");
            RegionCells::new()
        })
    }
}

impl BlockStore for MemoryBlockStore {
    fn get_type(&self, region: RegionCoord, index: CellIndex) -> BlockTypeId {
        self.regions
            .get(&region)
            .map_or(BlockTypeId::AIR, |cells| {
                BlockTypeId(cells.types[index.as_usize()])
            })
    }

    fn get_meta(&self, region: RegionCoord, index: CellIndex) -> u8 {
        self.regions
            .get(&region)
            .map_or(0, |cells| cells.metas[index.as_usize()])
    }

    fn set_type(&mut self, region: RegionCoord, index: CellIndex, block_type: BlockTypeId) {
        let cells = self.cells_mut(region);
        cells.types[index.as_usize()] = block_type.0;
        cells.version += 1;
    }

    fn set_meta(&mut self, region: RegionCoord, index: CellIndex, meta: u8) {
        let cells = self.cells_mut(region);
        cells.metas[index.as_usize()] = meta;
        cells.version += 1;
    }
}
