//! Entity classification flags.

use serde::{Deserialize, Serialize};

/// Per-entity classification bitflags. Combines via bitwise OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EntityFlags(pub u16);

impl EntityFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Moves under its own velocity; member of the moving registry.
    pub const MOVABLE: Self = Self(1 << 0);
    /// Its own movement is checked against collider bitmaps.
    pub const CAN_COLLIDE: Self = Self(1 << 1);
    /// Contributes its collider shape to neighboring bitmaps.
    pub const CAN_COLLIDE_WITH: Self = Self(1 << 2);
    /// Draw-order is pinned to its spawn row.
    pub const STATIC_Y: Self = Self(1 << 3);
    /// Players can interact with it.
    pub const INTERACTIVE: Self = Self(1 << 4);
    /// Drawn flat on the ground layer.
    pub const DECAL: Self = Self(1 << 5);
    /// Moves in flight mode (tested against the flight mask bit).
    pub const FLYING: Self = Self(1 << 6);
    /// Appearance data is waiting on the external decoder.
    pub const PENDING_DECODE: Self = Self(1 << 7);
    /// Excluded from the drawable registry.
    pub const HIDDEN: Self = Self(1 << 8);

    /// Returns true if `self` contains all bits in `other`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if any bit in `other` is set.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns true if no bits are set.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `self` with the bits of `other` set or cleared.
    #[must_use]
    pub fn with(self, other: Self, on: bool) -> Self {
        if on {
            Self(self.0 | other.0)
        } else {
            Self(self.0 & !other.0)
        }
    }
}

impl std::ops::BitOr for EntityFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for EntityFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for EntityFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
