//! The fixed-step simulation tick.
//!
//! One tick regenerates dirty collider bitmaps, then runs four phases in
//! order: movement, derived state, trigger edges, chat timers.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collider_gen::ExcludingMover;
use crate::entity::{EntityId, EntityIndex};
use crate::flags::EntityFlags;
use crate::registry::RegistryKind;
use crate::resolver::{MoveMode, MoveRequest};
use crate::world::{RegionSwitch, World, tile_under};

/// Bobbing amplitude of flying entities, in pixels.
pub const BOB_AMPLITUDE: f32 = 2.0;

/// Direction of a trigger transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEdge {
    /// Something entered an idle trigger.
    On,
    /// The last occupant left.
    Off,
}

/// Fired once per trigger transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// The trigger entity.
    pub trigger: EntityId,
    /// Transition direction.
    pub edge: TriggerEdge,
}

/// Per-tick counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickStats {
    /// Collider bitmaps regenerated at the start of the tick.
    pub regenerated: usize,
    /// Entities whose position changed.
    pub moved: usize,
    /// Moves stopped early by an obstacle.
    pub blocked: usize,
    /// Moves that hit the resolver step cap.
    pub truncated_walks: usize,
    /// Trigger transitions fired.
    pub triggers_fired: usize,
    /// Entities released after walking out of the loaded area.
    pub released: Vec<EntityId>,
}

impl World {
    /// Advances the simulation by `delta` seconds.
    ///
    /// `on_trigger` is called once for every trigger transition.
    pub fn tick(&mut self, delta: f32, mut on_trigger: impl FnMut(TriggerEvent)) -> TickStats {
        let delta = if delta.is_finite() && delta >= 0.0 {
            delta
        } else {
            warn!("Invalid tick delta {}; treating as zero", delta);
            0.0
        };

        let mut stats = TickStats {
            regenerated: self.regenerate_colliders(),
            ..TickStats::default()
        };

        self.move_entities(delta, &mut stats);
        self.update_derived_state();
        self.poll_triggers(&mut stats, &mut on_trigger);
        self.decay_chat(delta);
        self.elapsed += delta as f64;

        debug!(
            "Tick: {} regenerated, {} moved, {} blocked, {} triggers",
            stats.regenerated, stats.moved, stats.blocked, stats.triggers_fired
        );
        stats
    }

    /// Phase (a): resolve movement for the moving registry.
    fn move_entities(&mut self, delta: f32, stats: &mut TickStats) {
        let movers: Vec<EntityIndex> = self
            .registries
            .list(RegistryKind::Moving)
            .as_slice()
            .to_vec();

        for index in movers {
            let Some(entity) = self.arena.get(index) else {
                continue;
            };
            if entity.velocity() == Vec2::ZERO {
                continue;
            }
            let from = entity.position();
            let flying = entity.is_flying();
            let speed = if flying {
                1.0
            } else {
                tile_under(&self.grid, from).map_or(1.0, |t| t.speed_factor())
            };
            let request = MoveRequest {
                from,
                displacement: entity.velocity() * delta * speed,
                mode: if flying { MoveMode::Flight } else { MoveMode::Ground },
                collide: entity.flags().contains(EntityFlags::CAN_COLLIDE),
            };
            let id = entity.id();

            // Movers that also block others must not collide with themselves.
            let outcome = match self.collider_reach(index) {
                Some(reach) => {
                    let map = ExcludingMover::new(
                        &self.grid,
                        &self.arena,
                        &self.settings.footprint,
                        index,
                        reach,
                    );
                    self.resolver.resolve(&map, request)
                }
                None => self.resolver.resolve(&self.grid, request),
            };
            if outcome.blocked {
                stats.blocked += 1;
            }
            if outcome.truncated {
                stats.truncated_walks += 1;
            }
            if outcome.position == from {
                continue;
            }
            stats.moved += 1;
            if let RegionSwitch::Released(_) = self.relocate(index, outcome.position) {
                stats.released.push(id);
            }
        }
    }

    /// Phase (b): elevation, bobbing, water and light state.
    fn update_derived_state(&mut self) {
        let bob = (self.elapsed as f32 * TAU).sin() * BOB_AMPLITUDE;
        let ambient = self.ambient_light;
        for entity in self.arena.iter_mut() {
            let flying = entity.is_flying();
            let tile = tile_under(&self.grid, entity.position());
            let lit = entity
                .kind()
                .as_lightable()
                .is_some_and(|l| ambient <= l.light().on_below);
            let derived = &mut entity.derived;
            derived.in_water = !flying && tile.is_some_and(|t| t.is_water());
            derived.elevation = if flying { 0 } else { tile.map_or(0, |t| t.elevation()) };
            derived.bob = if flying { bob } else { 0.0 };
            derived.lit = lit;
        }
    }

    /// Phase (c): trigger edge detection against every moving entity.
    ///
    /// State is kept per trigger, not per occupant: `On` fires when the first
    /// moving entity enters an idle trigger and `Off` when the last one leaves.
    /// Entities entering or leaving while others remain inside fire nothing.
    fn poll_triggers(&mut self, stats: &mut TickStats, on_trigger: &mut impl FnMut(TriggerEvent)) {
        let movers: Vec<(EntityIndex, Vec2)> = self
            .registries
            .list(RegistryKind::Moving)
            .as_slice()
            .iter()
            .filter_map(|&i| self.arena.get(i).map(|e| (i, e.position())))
            .collect();
        let triggers: Vec<EntityIndex> = self
            .registries
            .list(RegistryKind::Trigger)
            .as_slice()
            .to_vec();

        for index in triggers {
            let Some(entity) = self.arena.get_mut(index) else {
                continue;
            };
            let Some(area) = entity.kind().as_triggerable().map(|t| t.trigger_area()) else {
                continue;
            };
            let origin = entity.position();
            let occupied = movers
                .iter()
                .any(|&(other, p)| other != index && area.contains(origin, p));
            if occupied == entity.trigger_active {
                continue;
            }
            entity.trigger_active = occupied;
            stats.triggers_fired += 1;
            on_trigger(TriggerEvent {
                trigger: entity.id(),
                edge: if occupied {
                    TriggerEdge::On
                } else {
                    TriggerEdge::Off
                },
            });
        }
    }

    /// Phase (d): chat bubble timers.
    fn decay_chat(&mut self, delta: f32) {
        for entity in self.arena.iter_mut() {
            if let Some(chat) = entity.chat.as_mut() {
                chat.remaining -= delta;
                if chat.remaining <= 0.0 {
                    entity.chat = None;
                }
            }
        }
    }
}
