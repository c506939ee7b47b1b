//! Spatial simulation core of a tile-based world: fixed-size regions, per-pixel
//! collider bitmaps, continuous movement with wall sliding, and entity registry
//! bookkeeping.

pub mod capability;
pub mod collider_gen;
pub mod entity;
pub mod error;
pub mod flags;
pub mod grid;
pub mod layout;
pub mod region;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod shape;
pub mod tick;
pub mod tile;
pub mod world;

pub use capability::{
    Archetype, Collidable, Drawable, EntityKind, LightSource, Lightable, SpriteId, TriggerArea,
    Triggerable,
};
pub use entity::{ChatBubble, DerivedState, Entity, EntityId};
pub use error::WorldError;
pub use flags::EntityFlags;
pub use grid::RegionGrid;
pub use layout::{ActiveBounds, GridLayout, RegionCoord};
pub use region::{COLLIDER_DIRTY, MASK_ALL, MASK_FLIGHT, MASK_GROUND, Region, TILES_DIRTY};
pub use registry::RegistryKind;
pub use resolver::{MoveMode, MoveOutcome, MoveRequest, ObstructionMap, Resolver};
pub use settings::{ContractPolicy, ResolverConfig, WorldSettings};
pub use shape::{ColliderRect, ColliderShape, Footprint, FootprintSpan, PixelRect};
pub use tick::{TickStats, TriggerEdge, TriggerEvent};
pub use tile::Tile;
pub use world::{RegionSwitch, World};
