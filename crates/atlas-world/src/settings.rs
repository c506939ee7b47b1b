//! Construction-time settings for a [`crate::World`].

use serde::{Deserialize, Serialize};

use crate::layout::GridLayout;
use crate::shape::Footprint;

/// How caller contract violations that have a sensible recovery are handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractPolicy {
    /// Return an error.
    Strict,
    /// Log a warning and recover.
    Lenient,
}

impl Default for ContractPolicy {
    /// `Strict` in debug builds, `Lenient` in release builds.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ContractPolicy::Strict
        } else {
            ContractPolicy::Lenient
        }
    }
}

/// Movement resolver tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum DDA steps per move before the walk is truncated.
    pub max_steps: u32,
}

impl ResolverConfig {
    /// Step cap large enough for the longest legal move.
    ///
    /// A move of `max_speed * max_delta` tiles crosses at most that many tiles
    /// worth of pixels on each axis, one step per pixel row or column. Wall
    /// deflections can add as many steps again on each axis.
    pub fn for_limits(max_speed: f32, max_delta: f32, layout: &GridLayout) -> Self {
        let tiles = (max_speed.abs() * max_delta.abs()).ceil().max(1.0) as u32;
        let pixels_per_tile = layout.tile_width.max(layout.tile_height) as u32;
        Self {
            max_steps: 4 * tiles * pixels_per_tile + 8,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_steps: 256 }
    }
}

/// Everything a world needs at construction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldSettings {
    /// Grid geometry.
    pub layout: GridLayout,
    /// The generic mover footprint used to inflate colliders.
    pub footprint: Footprint,
    /// Resolver tuning.
    pub resolver: ResolverConfig,
    /// Contract violation handling.
    pub contract_policy: ContractPolicy,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
