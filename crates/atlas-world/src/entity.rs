//! Entity records and the dense arena that owns them.
//!
//! Entities are addressed two ways: by a stable [`EntityId`] assigned by the
//! caller (network id), and by an [`EntityIndex`] into the [`EntityArena`].
//! Regions and registries store indices only, so dropping an entity from the
//! arena after detaching it everywhere cannot leave a dangling alias.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::capability::EntityKind;
use crate::flags::EntityFlags;
use crate::layout::RegionCoord;
use crate::shape::ColliderShape;

/// Stable entity identifier assigned by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Slot index into the [`EntityArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityIndex(pub u32);

/// A chat bubble shown above an entity until its timer runs out.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatBubble {
    /// Text, already filtered by the caller.
    pub text: String,
    /// Seconds left before the bubble disappears.
    pub remaining: f32,
}

/// Per-tick state derived from position, terrain and lighting.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DerivedState {
    /// Terrain elevation offset in pixels.
    pub elevation: i32,
    /// Bobbing offset in pixels (flying entities).
    pub bob: f32,
    /// Whether the entity's light is switched on.
    pub lit: bool,
    /// Whether the entity stands in water.
    pub in_water: bool,
}

/// One simulated entity.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    position: Vec2,
    velocity: Vec2,
    flags: EntityFlags,
    kind: Arc<dyn EntityKind>,
    pub(crate) region: Option<RegionCoord>,
    pub(crate) memberships: u8,
    pub(crate) derived: DerivedState,
    pub(crate) chat: Option<ChatBubble>,
    pub(crate) trigger_active: bool,
}

impl Entity {
    /// Creates an entity at `position` (tile units) with no flags.
    pub fn new(id: EntityId, position: Vec2, kind: Arc<dyn EntityKind>) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            flags: EntityFlags::NONE,
            kind,
            region: None,
            memberships: 0,
            derived: DerivedState::default(),
            chat: None,
            trigger_active: false,
        }
    }

    /// Sets the initial velocity (tiles per second).
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Sets the classification flags.
    pub fn with_flags(mut self, flags: EntityFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Stable id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Position in tile units.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Velocity in tiles per second.
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Classification flags.
    pub fn flags(&self) -> EntityFlags {
        self.flags
    }

    /// The archetype providing capabilities.
    pub fn kind(&self) -> &dyn EntityKind {
        self.kind.as_ref()
    }

    /// Region the entity is attached to, `None` once released.
    pub fn region(&self) -> Option<RegionCoord> {
        self.region
    }

    /// Derived per-tick state.
    pub fn derived(&self) -> &DerivedState {
        &self.derived
    }

    /// Current chat bubble, if any.
    pub fn chat(&self) -> Option<&ChatBubble> {
        self.chat.as_ref()
    }

    /// Whether something is currently inside this entity's trigger area.
    pub fn trigger_active(&self) -> bool {
        self.trigger_active
    }

    /// Collider shape, if the archetype has one.
    pub fn collider(&self) -> Option<&ColliderShape> {
        self.kind.as_collidable().map(|c| c.collider())
    }

    /// Whether this entity contributes to collider bitmaps.
    pub fn is_colliding(&self) -> bool {
        self.flags.contains(EntityFlags::CAN_COLLIDE_WITH) && self.collider().is_some()
    }

    /// Whether this entity moves in flight mode.
    pub fn is_flying(&self) -> bool {
        self.flags.contains(EntityFlags::FLYING)
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub(crate) fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub(crate) fn set_flags(&mut self, flags: EntityFlags) {
        self.flags = flags;
    }
}

/// Dense storage of entity records with slot reuse.
#[derive(Debug, Default)]
pub struct EntityArena {
    slots: Vec<Option<Entity>>,
    free: Vec<u32>,
}

impl EntityArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an entity and returns its slot.
    pub fn insert(&mut self, entity: Entity) -> EntityIndex {
        if let Some(slot) = self.free.pop() {
            self.slots[slot as usize] = Some(entity);
            EntityIndex(slot)
        } else {
            self.slots.push(Some(entity));
            EntityIndex((self.slots.len() - 1) as u32)
        }
    }

    /// Takes the entity out of its slot, freeing the slot for reuse.
    pub fn remove(&mut self, index: EntityIndex) -> Option<Entity> {
        let entity = self.slots.get_mut(index.0 as usize)?.take()?;
        self.free.push(index.0);
        Some(entity)
    }

    /// Immutable access by slot.
    pub fn get(&self, index: EntityIndex) -> Option<&Entity> {
        self.slots.get(index.0 as usize)?.as_ref()
    }

    /// Mutable access by slot.
    pub fn get_mut(&mut self, index: EntityIndex) -> Option<&mut Entity> {
        self.slots.get_mut(index.0 as usize)?.as_mut()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns `true` if no entity is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over live `(slot, entity)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (EntityIndex, &Entity)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EntityIndex(i as u32), e)))
    }

    /// Iterates mutably over live entities.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots.iter_mut().flatten()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
