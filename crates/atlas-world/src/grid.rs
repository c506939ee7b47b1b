//! The rectangular array of optional regions and its active bounds.

use crate::layout::{ActiveBounds, GridLayout, RegionCoord};
use crate::region::{MASK_ALL, Region};
use crate::resolver::ObstructionMap;
use crate::shape::PixelRect;

/// Owns every loaded [`Region`], indexed by grid coordinate.
#[derive(Debug)]
pub struct RegionGrid {
    layout: GridLayout,
    slots: Vec<Option<Region>>,
    active: Option<ActiveBounds>,
}

impl RegionGrid {
    /// Creates an empty grid.
    pub fn new(layout: GridLayout) -> Self {
        let mut slots = Vec::with_capacity(layout.regions_x * layout.regions_y);
        slots.resize_with(layout.regions_x * layout.regions_y, || None);
        Self {
            layout,
            slots,
            active: None,
        }
    }

    /// Grid geometry.
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    fn slot(&self, coord: RegionCoord) -> Option<usize> {
        self.layout
            .in_grid(coord)
            .then(|| coord.y as usize * self.layout.regions_x + coord.x as usize)
    }

    /// The loaded region at `coord`, if any.
    pub fn get(&self, coord: RegionCoord) -> Option<&Region> {
        self.slot(coord).and_then(|i| self.slots[i].as_ref())
    }

    /// Mutable access to the loaded region at `coord`, if any.
    pub fn get_mut(&mut self, coord: RegionCoord) -> Option<&mut Region> {
        self.slot(coord).and_then(|i| self.slots[i].as_mut())
    }

    /// Whether a region is loaded at `coord`.
    pub fn is_loaded(&self, coord: RegionCoord) -> bool {
        self.get(coord).is_some()
    }

    /// Stores a region in its slot, returning the region it replaced.
    ///
    /// Does nothing (and returns the region back) if its coordinate is outside
    /// the grid.
    pub fn insert(&mut self, region: Region) -> Result<Option<Region>, Region> {
        match self.slot(region.coord()) {
            Some(i) => {
                let old = self.slots[i].replace(region);
                self.recompute_active_bounds();
                Ok(old)
            }
            None => Err(region),
        }
    }

    /// Takes the region out of its slot.
    pub fn remove(&mut self, coord: RegionCoord) -> Option<Region> {
        let region = self.slot(coord).and_then(|i| self.slots[i].take());
        if region.is_some() {
            self.recompute_active_bounds();
        }
        region
    }

    /// Number of loaded regions.
    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Iterates over loaded regions.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.slots.iter().flatten()
    }

    /// Coordinates of loaded regions with the given dirty flag set.
    pub fn dirty_coords(&self, flag: u8) -> Vec<RegionCoord> {
        self.iter()
            .filter(|r| r.is_dirty(flag))
            .map(Region::coord)
            .collect()
    }

    /// Minimal rectangle holding every loaded region, `None` when empty.
    pub fn active_bounds(&self) -> Option<ActiveBounds> {
        self.active
    }

    fn recompute_active_bounds(&mut self) {
        let mut bounds: Option<ActiveBounds> = None;
        for region in self.iter() {
            let c = region.coord();
            match bounds.as_mut() {
                Some(b) => b.include(c),
                None => bounds = Some(ActiveBounds { min: c, max: c }),
            }
        }
        self.active = bounds;
    }

    /// Marks `flags` on every loaded region whose pixel rectangle overlaps
    /// `rect`. Returns how many regions were marked.
    pub fn mark_pixels_dirty(&mut self, rect: PixelRect, flags: u8) -> usize {
        if rect.is_empty() {
            return 0;
        }
        let rw = self.layout.region_pixel_width() as i32;
        let rh = self.layout.region_pixel_height() as i32;
        let x0 = rect.x.div_euclid(rw);
        let y0 = rect.y.div_euclid(rh);
        let x1 = (rect.right() - 1).div_euclid(rw);
        let y1 = (rect.bottom() - 1).div_euclid(rh);

        let mut marked = 0;
        for ry in y0..=y1 {
            for rx in x0..=x1 {
                if let Some(region) = self.get_mut(RegionCoord::new(rx, ry)) {
                    region.mark_dirty(flags);
                    marked += 1;
                }
            }
        }
        marked
    }

    /// Marks `flags` on the region at `coord` and its loaded neighbors.
    pub fn mark_neighborhood_dirty(&mut self, coord: RegionCoord, flags: u8) {
        for c in coord.with_neighbors() {
            if let Some(region) = self.get_mut(c) {
                region.mark_dirty(flags);
            }
        }
    }
}

impl ObstructionMap for RegionGrid {
    fn mask_at(&self, px: i32, py: i32) -> u8 {
        let Some(coord) = self.layout.region_of_pixel(px, py) else {
            return MASK_ALL;
        };
        match self.get(coord) {
            Some(region) => {
                let origin = self.layout.region_pixel_rect(coord);
                region.collider_at(px - origin.x, py - origin.y)
            }
            None => MASK_ALL,
        }
    }

    fn pixel_bounds(&self) -> PixelRect {
        self.layout.world_pixel_rect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
