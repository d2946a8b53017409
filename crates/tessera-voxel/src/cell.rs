//! Region geometry and cell addressing.
//!
//! A region is a column of `16 × 128 × 16` cells. Local coordinates are packed
//! into a single 15-bit index:
//!
//! ```text
//!  14    11 10     7 6          0
//! +--------+--------+------------+
//! |   x    |   z    |     y      |
//! +--------+--------+------------+
//! ```

/// Cells along the X and Z axes of a region.
pub const REGION_WIDTH: usize = 16;
/// Cells along the Y axis of a region.
pub const REGION_HEIGHT: usize = 128;
/// Total cells in one region.
pub const REGION_VOLUME: usize = REGION_WIDTH * REGION_HEIGHT * REGION_WIDTH;

const X_SHIFT: u16 = 11;
const Z_SHIFT: u16 = 7;
const XZ_MASK: u16 = 0xF;
const Y_MASK: u16 = 0x7F;

/// Block type identifier. `BlockTypeId(0)` is air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockTypeId(pub u16);

impl BlockTypeId {
    pub const AIR: Self = Self(0);
}

/// Packed local cell index, always below [`REGION_VOLUME`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex(u16);

impl CellIndex {
    /// Wraps a raw index. Returns `None` if it lies outside the region.
    pub fn from_raw(raw: u16) -> Option<Self> {
        (usize::from(raw) < REGION_VOLUME).then_some(Self(raw))
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    /// Offset into a flat region array.
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }
}

/// Packs local coordinates into a [`CellIndex`].
///
/// Coordinates are masked to the region bounds rather than rejected, so
/// out-of-range values wrap.
pub fn pack_index(x: u8, y: u8, z: u8) -> CellIndex {
    let x = u16::from(x) & XZ_MASK;
    let z = u16::from(z) & XZ_MASK;
    let y = u16::from(y) & Y_MASK;
    CellIndex(x << X_SHIFT | z << Z_SHIFT | y)
}

/// Inverse of [`pack_index`] for in-range coordinates.
pub fn unpack_index(index: CellIndex) -> LocalPos {
    let raw = index.0;
    LocalPos {
        x: ((raw >> X_SHIFT) & XZ_MASK) as u8,
        y: (raw & Y_MASK) as u8,
        z: ((raw >> Z_SHIFT) & XZ_MASK) as u8,
    }
}

/// Cell coordinates inside one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

impl LocalPos {
    /// Returns `None` if any coordinate is outside the region.
    pub fn new(x: u8, y: u8, z: u8) -> Option<Self> {
        let in_bounds = usize::from(x) < REGION_WIDTH
            && usize::from(y) < REGION_HEIGHT
            && usize::from(z) < REGION_WIDTH;
        in_bounds.then_some(Self { x, y, z })
    }

    pub fn index(self) -> CellIndex {
        pack_index(self.x, self.y, self.z)
    }
}

/// Horizontal position of a region, in region units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCoord {
    pub x: i32,
    pub z: i32,
}

impl RegionCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Splits world coordinates into a region and a local position.
    ///
    /// Returns `None` if `y` is outside `0..128`.
    pub fn split_world(x: i32, y: i32, z: i32) -> Option<(Self, LocalPos)> {
        let y = u8::try_from(y).ok().filter(|y| usize::from(*y) < REGION_HEIGHT)?;
        let width = REGION_WIDTH as i32;
        let region = Self::new(x.div_euclid(width), z.div_euclid(width));
        let local = LocalPos {
            x: x.rem_euclid(width) as u8,
            y,
            z: z.rem_euclid(width) as u8,
        };
        Some((region, local))
    }

    /// World coordinates of `pos` inside this region.
    pub fn world_pos(self, pos: LocalPos) -> (i32, i32, i32) {
        let width = REGION_WIDTH as i32;
        (
            self.x.wrapping_mul(width).wrapping_add(i32::from(pos.x)),
            i32::from(pos.y),
            self.z.wrapping_mul(width).wrapping_add(i32::from(pos.z)),
        )
    }
}
