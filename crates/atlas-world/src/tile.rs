//! Terrain tile kinds and their static properties.
//!
//! Tiles are stored as one byte each inside a region. The byte values are the
//! ones produced by the external tile codec; unknown values decode to
//! [`Tile::None`] so that corrupt data blocks movement instead of opening holes.

use serde::{Deserialize, Serialize};

/// Movement speed multiplier for entities wading through water.
pub const WATER_SPEED_FACTOR: f32 = 0.5;

/// Pixel offset applied to entities standing in water (they sink a little).
pub const WATER_ELEVATION: i32 = -4;

/// A terrain tile kind.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    /// Void. Blocks everything.
    None = 0,
    /// Plain walkable ground.
    #[default]
    Ground = 1,
    /// Shallow water: walkable at reduced speed.
    Water = 2,
    /// Ice floor.
    Ice = 3,
    /// Wooden floor.
    Wood = 4,
    /// Horizontal wall segment.
    WallHorizontal = 5,
    /// Vertical wall segment.
    WallVertical = 6,
}

impl Tile {
    /// Every tile kind, in byte order.
    pub const ALL: [Tile; 7] = [
        Tile::None,
        Tile::Ground,
        Tile::Water,
        Tile::Ice,
        Tile::Wood,
        Tile::WallHorizontal,
        Tile::WallVertical,
    ];

    /// Decodes a tile byte. Returns `None` for bytes outside the enumeration.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Decodes a tile byte, mapping unknown values to [`Tile::None`].
    pub fn from_byte_lossy(byte: u8) -> Self {
        Self::from_byte(byte).unwrap_or(Tile::None)
    }

    /// The byte stored in region tile buffers.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Whether this tile fully blocks both ground and flight movement.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            Tile::None | Tile::WallHorizontal | Tile::WallVertical
        )
    }

    /// Whether this tile is water.
    pub fn is_water(self) -> bool {
        self == Tile::Water
    }

    /// Multiplier applied to ground movement on this tile.
    pub fn speed_factor(self) -> f32 {
        if self.is_water() {
            WATER_SPEED_FACTOR
        } else {
            1.0
        }
    }

    /// Vertical draw offset in pixels for ground entities on this tile.
    pub fn elevation(self) -> i32 {
        if self.is_water() { WATER_ELEVATION } else { 0 }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
