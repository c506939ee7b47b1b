//! World error types.
//!
//! Every variant is a contract violation by the caller. Numerical degradation in
//! the movement resolver is reported through its outcome, never as an error.

use thiserror::Error;

use crate::entity::EntityId;
use crate::layout::RegionCoord;

/// Errors returned by [`crate::World`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    /// Region coordinates outside the grid.
    #[error("region ({}, {}) is outside the {regions_x}x{regions_y} grid", .coord.x, .coord.y)]
    OutOfRange {
        /// The offending coordinate.
        coord: RegionCoord,
        /// Grid width in regions.
        regions_x: usize,
        /// Grid height in regions.
        regions_y: usize,
    },
    /// The region exists in the grid but is not loaded.
    #[error("region ({}, {}) is not loaded", .0.x, .0.y)]
    RegionNotLoaded(RegionCoord),
    /// An entity with this id is already registered.
    #[error("duplicate entity id {0:?}")]
    DuplicateEntity(EntityId),
    /// No entity with this id is registered.
    #[error("unknown entity id {0:?}")]
    UnknownEntity(EntityId),
    /// Decompressed tile buffer has the wrong size.
    #[error("tile buffer has {actual} bytes, expected {expected}")]
    InvalidTileData {
        /// Required byte count (`region_size²`).
        expected: usize,
        /// Byte count received.
        actual: usize,
    },
    /// Tile coordinate outside the map.
    #[error("tile ({0}, {1}) is outside the map")]
    TileOutOfBounds(i32, i32),
}
