//! Rasterizes tile obstruction and nearby entity colliders into a region's
//! per-pixel bitmap.
//!
//! The bitmap is a pure function of the region's tiles plus the colliding
//! entities registered in the region and its 8 neighbors. Nothing else writes
//! to it.

use tracing::debug;

use crate::entity::{Entity, EntityArena, EntityIndex};
use crate::grid::RegionGrid;
use crate::layout::{GridLayout, RegionCoord};
use crate::region::{COLLIDER_DIRTY, MASK_ALL};
use crate::resolver::ObstructionMap;
use crate::shape::{Footprint, PixelRect};

/// Fills `out` with the collider bitmap of the region at `coord`.
///
/// `out` is cleared and resized to the region's pixel count. Does nothing if
/// the region is not loaded.
pub fn generate_collider(
    grid: &RegionGrid,
    arena: &EntityArena,
    footprint: &Footprint,
    coord: RegionCoord,
    out: &mut Vec<u8>,
) {
    let layout = grid.layout();
    let Some(region) = grid.get(coord) else {
        return;
    };
    let region_rect = layout.region_pixel_rect(coord);
    let width = layout.region_pixel_width();

    out.clear();
    out.resize(layout.region_pixel_count(), 0);

    // Pass 1: blocking tiles.
    let (tw, th) = (layout.tile_width as i32, layout.tile_height as i32);
    for ty in 0..region.size() {
        for tx in 0..region.size() {
            if region.tile(tx, ty).is_blocking() {
                let block = PixelRect::new(tx as i32 * tw, ty as i32 * th, tw, th);
                paint(out, width, block, MASK_ALL);
            }
        }
    }

    // Pass 2: colliding entities here and across borders.
    for neighbor in coord.with_neighbors() {
        let Some(source) = grid.get(neighbor) else {
            continue;
        };
        for &index in source.colliding() {
            let Some(entity) = arena.get(index) else {
                continue;
            };
            let Some(shape) = entity.collider() else {
                continue;
            };
            let (px, py) = layout.pixel_of(entity.position());
            let reach = footprint.inflate_bounds(shape.bounds().translate(px, py));
            if !reach.intersects(&region_rect) {
                continue;
            }
            for rect in shape.rects() {
                let world_rect = rect.rect().translate(px, py);
                let mask = rect.mask();
                if rect.exact {
                    paint_clipped(out, width, region_rect, world_rect, mask);
                } else {
                    for inflated in footprint.inflate_rects(world_rect) {
                        paint_clipped(out, width, region_rect, inflated, mask);
                    }
                }
            }
        }
    }
}

/// Regenerates every loaded region marked [`COLLIDER_DIRTY`].
///
/// Returns the number of regions regenerated.
pub fn regenerate_dirty(grid: &mut RegionGrid, arena: &EntityArena, footprint: &Footprint) -> usize {
    let dirty = grid.dirty_coords(COLLIDER_DIRTY);
    let mut scratch = Vec::new();
    for &coord in &dirty {
        generate_collider(grid, arena, footprint, coord, &mut scratch);
        if let Some(region) = grid.get_mut(coord) {
            scratch = region.replace_collider(scratch);
        }
    }
    if !dirty.is_empty() {
        debug!("Regenerated {} collider bitmaps", dirty.len());
    }
    dirty.len()
}

/// Obstruction view for a mover that also contributes a collider.
///
/// Stored bitmaps include the mover's own inflated shape, which would leave it
/// permanently stuck. Pixels inside `reach` (everything the mover can have
/// painted) are rasterized on demand from tiles and every other colliding
/// entity nearby; all other pixels come from the stored bitmaps.
pub struct ExcludingMover<'a> {
    grid: &'a RegionGrid,
    arena: &'a EntityArena,
    footprint: &'a Footprint,
    mover: EntityIndex,
    reach: PixelRect,
}

impl<'a> ExcludingMover<'a> {
    /// Creates a view that ignores `mover`, whose collider covers at most `reach`.
    pub fn new(
        grid: &'a RegionGrid,
        arena: &'a EntityArena,
        footprint: &'a Footprint,
        mover: EntityIndex,
        reach: PixelRect,
    ) -> Self {
        Self {
            grid,
            arena,
            footprint,
            mover,
            reach,
        }
    }
}

impl ObstructionMap for ExcludingMover<'_> {
    fn mask_at(&self, px: i32, py: i32) -> u8 {
        if !self.reach.contains(px, py) {
            return self.grid.mask_at(px, py);
        }
        let layout = self.grid.layout();
        let Some(coord) = layout.region_of_pixel(px, py) else {
            return MASK_ALL;
        };
        let Some(region) = self.grid.get(coord) else {
            return MASK_ALL;
        };
        let origin = layout.region_pixel_rect(coord);
        let tx = ((px - origin.x) / layout.tile_width as i32) as usize;
        let ty = ((py - origin.y) / layout.tile_height as i32) as usize;
        if region.tile(tx, ty).is_blocking() {
            return MASK_ALL;
        }

        let mut mask = 0;
        for neighbor in coord.with_neighbors() {
            let Some(source) = self.grid.get(neighbor) else {
                continue;
            };
            for &index in source.colliding() {
                if index == self.mover {
                    continue;
                }
                if let Some(entity) = self.arena.get(index) {
                    mask |= entity_mask_at(entity, self.footprint, layout, px, py);
                }
                if mask == MASK_ALL {
                    return mask;
                }
            }
        }
        mask
    }

    fn pixel_bounds(&self) -> PixelRect {
        self.grid.pixel_bounds()
    }
}

/// Mask bits one entity's collider paints at world pixel `(px, py)`.
fn entity_mask_at(entity: &Entity, footprint: &Footprint, layout: &GridLayout, px: i32, py: i32) -> u8 {
    let Some(shape) = entity.collider() else {
        return 0;
    };
    let (ex, ey) = layout.pixel_of(entity.position());
    let mut mask = 0;
    for rect in shape.rects() {
        let world_rect = rect.rect().translate(ex, ey);
        let hit = if rect.exact {
            world_rect.contains(px, py)
        } else {
            footprint
                .inflate_rects(world_rect)
                .any(|r| r.contains(px, py))
        };
        if hit {
            mask |= rect.mask();
        }
    }
    mask
}

/// ORs `mask` into the part of a world-space rect that falls in the region.
fn paint_clipped(out: &mut [u8], width: usize, region_rect: PixelRect, rect: PixelRect, mask: u8) {
    if let Some(clipped) = rect.intersection(&region_rect) {
        paint(out, width, clipped.translate(-region_rect.x, -region_rect.y), mask);
    }
}

/// ORs `mask` into a region-local rect already known to be in bounds.
fn paint(out: &mut [u8], width: usize, local: PixelRect, mask: u8) {
    for y in local.y..local.bottom() {
        let row = y as usize * width;
        for px in &mut out[row + local.x as usize..row + local.right() as usize] {
            *px |= mask;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
