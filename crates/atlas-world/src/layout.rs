//! Grid geometry: region coordinates and the tile/pixel scale of the world.
//!
//! World positions are continuous and measured in tiles. Pixel coordinates are
//! integers, `tile_width`/`tile_height` pixels per tile. Regions are square
//! blocks of `region_size` tiles.

use serde::{Deserialize, Serialize};

use crate::shape::PixelRect;

/// Identifies a region's position in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionCoord {
    /// Region column.
    pub x: i32,
    /// Region row.
    pub y: i32,
}

impl RegionCoord {
    /// Creates a new region coordinate.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the coordinate offset by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// This coordinate and its 8 neighbors, row-major.
    pub fn with_neighbors(self) -> impl Iterator<Item = RegionCoord> {
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| self.offset(dx, dy)))
    }
}

/// Minimal rectangle of region coordinates holding any loaded region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveBounds {
    /// Smallest loaded region coordinate on each axis.
    pub min: RegionCoord,
    /// Largest loaded region coordinate on each axis (inclusive).
    pub max: RegionCoord,
}

impl ActiveBounds {
    /// Whether the coordinate lies inside the bounds.
    pub fn contains(&self, coord: RegionCoord) -> bool {
        coord.x >= self.min.x && coord.x <= self.max.x && coord.y >= self.min.y && coord.y <= self.max.y
    }

    /// Grows the bounds to include `coord`.
    pub fn include(&mut self, coord: RegionCoord) {
        self.min.x = self.min.x.min(coord.x);
        self.min.y = self.min.y.min(coord.y);
        self.max.x = self.max.x.max(coord.x);
        self.max.y = self.max.y.max(coord.y);
    }
}

/// Size of the grid and of its tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Regions along X.
    pub regions_x: usize,
    /// Regions along Y.
    pub regions_y: usize,
    /// Region side length in tiles.
    pub region_size: usize,
    /// Tile width in pixels.
    pub tile_width: usize,
    /// Tile height in pixels.
    pub tile_height: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            regions_x: 8,
            regions_y: 8,
            region_size: 16,
            tile_width: 16,
            tile_height: 8,
        }
    }
}

impl GridLayout {
    /// Number of tiles in one region.
    pub fn region_tile_count(&self) -> usize {
        self.region_size * self.region_size
    }

    /// Region width in pixels.
    pub fn region_pixel_width(&self) -> usize {
        self.region_size * self.tile_width
    }

    /// Region height in pixels.
    pub fn region_pixel_height(&self) -> usize {
        self.region_size * self.tile_height
    }

    /// Number of bytes in one region's collider bitmap.
    pub fn region_pixel_count(&self) -> usize {
        self.region_pixel_width() * self.region_pixel_height()
    }

    /// World width in tiles.
    pub fn world_tiles_x(&self) -> usize {
        self.regions_x * self.region_size
    }

    /// World height in tiles.
    pub fn world_tiles_y(&self) -> usize {
        self.regions_y * self.region_size
    }

    /// Whole-map pixel rectangle.
    pub fn world_pixel_rect(&self) -> PixelRect {
        PixelRect::new(
            0,
            0,
            (self.regions_x * self.region_pixel_width()) as i32,
            (self.regions_y * self.region_pixel_height()) as i32,
        )
    }

    /// Pixel rectangle covered by a region.
    pub fn region_pixel_rect(&self, coord: RegionCoord) -> PixelRect {
        let w = self.region_pixel_width() as i32;
        let h = self.region_pixel_height() as i32;
        PixelRect::new(coord.x * w, coord.y * h, w, h)
    }

    /// Whether the coordinate addresses a slot of the grid.
    pub fn in_grid(&self, coord: RegionCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as usize) < self.regions_x
            && (coord.y as usize) < self.regions_y
    }

    /// Region owning a continuous world position (tile units).
    ///
    /// Out-of-range positions are clamped to the nearest edge region; movement
    /// math can transiently produce slightly out-of-bounds values.
    pub fn region_coord_of(&self, world_x: f32, world_y: f32) -> RegionCoord {
        let size = self.region_size as f32;
        let rx = (world_x / size).floor();
        let ry = (world_y / size).floor();
        RegionCoord::new(
            clamp_index(rx, self.regions_x),
            clamp_index(ry, self.regions_y),
        )
    }

    /// Region owning an integer tile coordinate, or `None` outside the map.
    pub fn region_of_tile(&self, tx: i32, ty: i32) -> Option<RegionCoord> {
        if tx < 0 || ty < 0 {
            return None;
        }
        let coord = RegionCoord::new(
            tx / self.region_size as i32,
            ty / self.region_size as i32,
        );
        self.in_grid(coord).then_some(coord)
    }

    /// Region owning a pixel, or `None` outside the map.
    pub fn region_of_pixel(&self, px: i32, py: i32) -> Option<RegionCoord> {
        if px < 0 || py < 0 {
            return None;
        }
        let coord = RegionCoord::new(
            px / self.region_pixel_width() as i32,
            py / self.region_pixel_height() as i32,
        );
        self.in_grid(coord).then_some(coord)
    }

    /// Pixel containing a continuous world position.
    pub fn pixel_of(&self, world: glam::Vec2) -> (i32, i32) {
        (
            (world.x * self.tile_width as f32).floor() as i32,
            (world.y * self.tile_height as f32).floor() as i32,
        )
    }

    /// Pixels per tile along each axis.
    pub fn pixel_scale(&self) -> glam::Vec2 {
        glam::Vec2::new(self.tile_width as f32, self.tile_height as f32)
    }
}

fn clamp_index(value: f32, len: usize) -> i32 {
    if len == 0 || value.is_nan() || value < 0.0 {
        return 0;
    }
    (value as i64).min(len as i64 - 1) as i32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
