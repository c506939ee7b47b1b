//! Fixed-size tile chunk with its collider bitmap, entity lists, dirty flags
//! and version counter.
//!
//! Local tile coordinates are in `[0, region_size)`. Out-of-bounds reads
//! return [`Tile::None`] (or a fully blocked pixel) and out-of-bounds writes
//! are ignored with a warning log.

use crate::entity::EntityIndex;
use crate::layout::{GridLayout, RegionCoord};
use crate::tile::Tile;

/// Bitmap bit: blocks ground movers.
pub const MASK_GROUND: u8 = 0b01;
/// Bitmap bit: blocks flying movers.
pub const MASK_FLIGHT: u8 = 0b10;
/// Bitmap value for pixels blocking everything.
pub const MASK_ALL: u8 = MASK_GROUND | MASK_FLIGHT;

/// Dirty-flag bit: tiles changed, the rendering layer should redraw.
pub const TILES_DIRTY: u8 = 0b0000_0001;
/// Dirty-flag bit: the collider bitmap must be regenerated.
pub const COLLIDER_DIRTY: u8 = 0b0000_0010;

/// A loaded region of the world grid.
#[derive(Clone, Debug)]
pub struct Region {
    coord: RegionCoord,
    size: usize,
    pixel_width: usize,
    pixel_height: usize,
    tiles: Vec<Tile>,
    collider: Vec<u8>,
    entities: Vec<EntityIndex>,
    colliding: Vec<EntityIndex>,
    /// Bitfield of dirty flags.
    dirty: u8,
    /// Incremented on each tile mutation and bitmap regeneration.
    version: u64,
}

impl Region {
    /// Creates a region filled with [`Tile::Ground`].
    ///
    /// The collider bitmap starts empty and the region is marked
    /// [`COLLIDER_DIRTY`] so the next regeneration pass fills it.
    pub fn new(coord: RegionCoord, layout: &GridLayout) -> Self {
        Self::with_tiles(coord, layout, vec![Tile::Ground; layout.region_tile_count()])
    }

    /// Creates a region from decoded tile bytes.
    ///
    /// `bytes` must hold exactly `region_size²` entries; the caller validates the
    /// length. Unknown bytes decode to [`Tile::None`]. Returns the region and the
    /// number of unknown bytes encountered.
    pub fn from_bytes(coord: RegionCoord, layout: &GridLayout, bytes: &[u8]) -> (Self, usize) {
        let mut unknown = 0;
        let tiles = bytes
            .iter()
            .map(|&b| {
                Tile::from_byte(b).unwrap_or_else(|| {
                    unknown += 1;
                    Tile::None
                })
            })
            .collect();
        (Self::with_tiles(coord, layout, tiles), unknown)
    }

    fn with_tiles(coord: RegionCoord, layout: &GridLayout, tiles: Vec<Tile>) -> Self {
        Self {
            coord,
            size: layout.region_size,
            pixel_width: layout.region_pixel_width(),
            pixel_height: layout.region_pixel_height(),
            tiles,
            collider: vec![0; layout.region_pixel_count()],
            entities: Vec::new(),
            colliding: Vec::new(),
            dirty: COLLIDER_DIRTY | TILES_DIRTY,
            version: 0,
        }
    }

    /// Grid coordinate of this region.
    pub fn coord(&self) -> RegionCoord {
        self.coord
    }

    /// Side length in tiles.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the tile at local `(x, y)`, or [`Tile::None`] out of bounds.
    pub fn tile(&self, x: usize, y: usize) -> Tile {
        if x >= self.size || y >= self.size {
            tracing::warn!("Region::tile out of bounds: ({}, {})", x, y);
            return Tile::None;
        }
        self.tiles[y * self.size + x]
    }

    /// Sets the tile at local `(x, y)` and returns the previous one.
    ///
    /// Marks [`TILES_DIRTY`] and bumps the version. Collider invalidation is the
    /// grid's job since it may cross region borders. Returns `None` (and logs)
    /// when out of bounds.
    pub fn set_tile(&mut self, x: usize, y: usize, tile: Tile) -> Option<Tile> {
        if x >= self.size || y >= self.size {
            tracing::warn!("Region::set_tile out of bounds: ({}, {})", x, y);
            return None;
        }
        let previous = std::mem::replace(&mut self.tiles[y * self.size + x], tile);
        self.dirty |= TILES_DIRTY;
        self.version += 1;
        Some(previous)
    }

    /// All tiles, row-major.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// The collider bitmap, row-major, `pixel_width × pixel_height` bytes.
    pub fn collider(&self) -> &[u8] {
        &self.collider
    }

    /// Bitmap value at local pixel `(px, py)`; [`MASK_ALL`] out of bounds.
    pub fn collider_at(&self, px: i32, py: i32) -> u8 {
        if px < 0 || py < 0 || px as usize >= self.pixel_width || py as usize >= self.pixel_height
        {
            return MASK_ALL;
        }
        self.collider[py as usize * self.pixel_width + px as usize]
    }

    /// Region width in pixels.
    pub fn pixel_width(&self) -> usize {
        self.pixel_width
    }

    /// Region height in pixels.
    pub fn pixel_height(&self) -> usize {
        self.pixel_height
    }

    /// Every entity physically inside the region.
    pub fn entities(&self) -> &[EntityIndex] {
        &self.entities
    }

    /// Entities in this region that contribute to collider bitmaps.
    pub fn colliding(&self) -> &[EntityIndex] {
        &self.colliding
    }

    /// Returns the current dirty flags.
    pub fn dirty_flags(&self) -> u8 {
        self.dirty
    }

    /// Returns `true` if the specified dirty flag (or combination) is set.
    pub fn is_dirty(&self, flag: u8) -> bool {
        self.dirty & flag == flag
    }

    /// Mark specific dirty flags.
    pub fn mark_dirty(&mut self, flags: u8) {
        self.dirty |= flags;
    }

    /// Clears the specified dirty flag bits.
    pub fn clear_dirty(&mut self, flags: u8) {
        self.dirty &= !flags;
    }

    /// Returns the current version counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Installs a freshly generated bitmap and clears [`COLLIDER_DIRTY`].
    ///
    /// Returns the previous buffer so the generator can reuse its allocation.
    pub(crate) fn replace_collider(&mut self, bitmap: Vec<u8>) -> Vec<u8> {
        debug_assert_eq!(bitmap.len(), self.collider.len());
        self.dirty &= !COLLIDER_DIRTY;
        self.version += 1;
        std::mem::replace(&mut self.collider, bitmap)
    }

    pub(crate) fn attach(&mut self, index: EntityIndex, colliding: bool) {
        self.entities.push(index);
        if colliding {
            self.colliding.push(index);
        }
    }

    /// Removes the entity from both lists. Returns `false` if it was absent.
    pub(crate) fn detach(&mut self, index: EntityIndex) -> bool {
        self.set_colliding(index, false);
        match self.entities.iter().position(|&e| e == index) {
            Some(pos) => {
                self.entities.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Adds or removes the entity from the colliding sublist.
    pub(crate) fn set_colliding(&mut self, index: EntityIndex, colliding: bool) {
        let pos = self.colliding.iter().position(|&e| e == index);
        match (pos, colliding) {
            (None, true) => self.colliding.push(index),
            (Some(pos), false) => {
                self.colliding.swap_remove(pos);
            }
            _ => {}
        }
    }

    /// Empties both entity lists, returning every contained entity.
    pub(crate) fn drain_entities(&mut self) -> Vec<EntityIndex> {
        self.colliding.clear();
        std::mem::take(&mut self.entities)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
