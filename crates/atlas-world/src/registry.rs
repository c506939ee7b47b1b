//! Derived index lists over the entity arena.
//!
//! Each [`RegistryKind`] has a predicate over the entity's flags and
//! capabilities. [`Registries::sync`] re-evaluates every predicate and fixes
//! up the lists, so callers only need to call it after anything that can change
//! membership. Entities remember which lists they are in through a membership
//! bitmask, making removal independent of the current predicate results.

use rustc_hash::FxHashMap;

use crate::entity::{Entity, EntityId, EntityIndex};
use crate::flags::EntityFlags;

/// The derived lists maintained by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    /// Visible entities the renderer draws.
    Drawable,
    /// Entities advanced by the movement phase.
    Moving,
    /// Entities with a light.
    Light,
    /// Lights that also draw a glow sprite.
    LightSprite,
    /// Entities polled for trigger transitions.
    Trigger,
    /// Entities waiting on the appearance decoder.
    PendingDecode,
}

impl RegistryKind {
    /// Every registry kind.
    pub const ALL: [RegistryKind; 6] = [
        RegistryKind::Drawable,
        RegistryKind::Moving,
        RegistryKind::Light,
        RegistryKind::LightSprite,
        RegistryKind::Trigger,
        RegistryKind::PendingDecode,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    fn bit(self) -> u8 {
        1 << self.slot()
    }

    /// Whether the entity belongs in this registry.
    pub fn admits(self, entity: &Entity) -> bool {
        let flags = entity.flags();
        let kind = entity.kind();
        match self {
            RegistryKind::Drawable => {
                kind.as_drawable().is_some() && !flags.contains(EntityFlags::HIDDEN)
            }
            RegistryKind::Moving => flags.contains(EntityFlags::MOVABLE),
            RegistryKind::Light => kind.as_lightable().is_some(),
            RegistryKind::LightSprite => kind
                .as_lightable()
                .is_some_and(|l| l.has_light_sprite()),
            RegistryKind::Trigger => kind.as_triggerable().is_some(),
            RegistryKind::PendingDecode => flags.contains(EntityFlags::PENDING_DECODE),
        }
    }
}

/// An unordered set of entity indices with O(1) insert and remove.
#[derive(Debug, Default)]
pub struct RegistryList {
    items: Vec<EntityIndex>,
    positions: FxHashMap<EntityIndex, usize>,
}

impl RegistryList {
    /// Adds `index`. Returns `false` if it was already present.
    pub fn insert(&mut self, index: EntityIndex) -> bool {
        if self.positions.contains_key(&index) {
            return false;
        }
        self.positions.insert(index, self.items.len());
        self.items.push(index);
        true
    }

    /// Removes `index`. Returns `false` if it was absent.
    pub fn remove(&mut self, index: EntityIndex) -> bool {
        let Some(pos) = self.positions.remove(&index) else {
            return false;
        };
        self.items.swap_remove(pos);
        if let Some(&moved) = self.items.get(pos) {
            self.positions.insert(moved, pos);
        }
        true
    }

    /// Whether `index` is present.
    pub fn contains(&self, index: EntityIndex) -> bool {
        self.positions.contains_key(&index)
    }

    /// Members in storage order.
    pub fn as_slice(&self) -> &[EntityIndex] {
        &self.items
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list has no members.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// All derived lists plus the stable-id map.
#[derive(Debug, Default)]
pub struct Registries {
    lists: [RegistryList; 6],
    by_id: FxHashMap<EntityId, EntityIndex>,
}

impl Registries {
    /// Creates empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// The list for `kind`.
    pub fn list(&self, kind: RegistryKind) -> &RegistryList {
        &self.lists[kind.slot()]
    }

    /// Arena slot for a stable id.
    pub fn index_of(&self, id: EntityId) -> Option<EntityIndex> {
        self.by_id.get(&id).copied()
    }

    /// Number of entities in the by-id map.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if no entity is registered.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub(crate) fn insert_id(&mut self, id: EntityId, index: EntityIndex) -> Option<EntityIndex> {
        self.by_id.insert(id, index)
    }

    pub(crate) fn remove_id(&mut self, id: EntityId) -> Option<EntityIndex> {
        self.by_id.remove(&id)
    }

    /// Re-evaluates every predicate for the entity and updates list
    /// membership and the entity's membership mask.
    pub fn sync(&mut self, index: EntityIndex, entity: &mut Entity) {
        for kind in RegistryKind::ALL {
            let wanted = kind.admits(entity);
            let present = entity.memberships & kind.bit() != 0;
            if wanted == present {
                continue;
            }
            let list = &mut self.lists[kind.slot()];
            if wanted {
                list.insert(index);
                entity.memberships |= kind.bit();
            } else {
                list.remove(index);
                entity.memberships &= !kind.bit();
            }
        }
    }

    /// Removes the entity from every list it is in.
    pub fn clear(&mut self, index: EntityIndex, entity: &mut Entity) {
        for kind in RegistryKind::ALL {
            if entity.memberships & kind.bit() != 0 {
                self.lists[kind.slot()].remove(index);
            }
        }
        entity.memberships = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
