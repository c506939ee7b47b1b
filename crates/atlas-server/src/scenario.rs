//! Builds the world the headless server simulates: walled map, ponds, trees,
//! wanderers, birds, lamps and a pressure plate.

use std::f32::consts::TAU;
use std::sync::Arc;

use atlas_config::Config;
use atlas_world::{
    Archetype, ColliderRect, ColliderShape, ContractPolicy, Entity, EntityFlags, EntityId,
    Footprint, GridLayout, LightSource, RegionCoord, ResolverConfig, SpriteId, Tile, TriggerArea,
    World, WorldError, WorldSettings,
};
use glam::Vec2;
use tracing::info;

/// Length of one simulated day in seconds.
pub const DAY_LENGTH_S: f32 = 20.0;

/// Ticks between wanderer direction changes.
pub const STEER_INTERVAL: u32 = 45;

/// Maps the configuration onto world construction settings.
pub fn world_settings(config: &Config) -> WorldSettings {
    let w = &config.world;
    let layout = GridLayout {
        regions_x: w.regions_x.max(1) as usize,
        regions_y: w.regions_y.max(1) as usize,
        region_size: w.region_size.max(1) as usize,
        tile_width: w.tile_width.max(1) as usize,
        tile_height: w.tile_height.max(1) as usize,
    };
    let contract_policy = match config.simulation.strict_contracts {
        Some(true) => ContractPolicy::Strict,
        Some(false) => ContractPolicy::Lenient,
        None => ContractPolicy::default(),
    };
    WorldSettings {
        layout,
        footprint: Footprint::default(),
        resolver: ResolverConfig::for_limits(
            config.simulation.max_speed_tiles_per_s,
            config.simulation.max_tick_delta_s,
            &layout,
        ),
        contract_policy,
    }
}

/// Tile bytes for one region: a wall around the whole map and a pond in
/// every other region.
pub fn region_tiles(layout: &GridLayout, coord: RegionCoord) -> Vec<u8> {
    let size = layout.region_size as i32;
    let max_x = layout.world_tiles_x() as i32 - 1;
    let max_y = layout.world_tiles_y() as i32 - 1;
    let pond = (coord.x + coord.y) % 2 == 0;

    let mut bytes = Vec::with_capacity(layout.region_tile_count());
    for ly in 0..size {
        for lx in 0..size {
            let (tx, ty) = (coord.x * size + lx, coord.y * size + ly);
            let tile = if ty == 0 || ty == max_y {
                Tile::WallHorizontal
            } else if tx == 0 || tx == max_x {
                Tile::WallVertical
            } else if pond && (2..5).contains(&lx) && (2..4).contains(&ly) {
                Tile::Water
            } else {
                Tile::Ground
            };
            bytes.push(tile.to_byte());
        }
    }
    bytes
}

/// Entities steered by the server loop.
#[derive(Debug, Default)]
pub struct Scenario {
    /// Ground movers that change direction periodically.
    pub wanderers: Vec<EntityId>,
    /// Total entities spawned.
    pub spawned: usize,
}

/// Loads every region and spawns the cast.
pub fn populate(world: &mut World) -> Result<Scenario, WorldError> {
    let layout = *world.layout();
    for ry in 0..layout.regions_y as i32 {
        for rx in 0..layout.regions_x as i32 {
            let coord = RegionCoord::new(rx, ry);
            world.load_region(coord, Some(&region_tiles(&layout, coord)))?;
        }
    }

    let tree = Arc::new(
        Archetype::named("tree")
            .with_sprite(SpriteId(10))
            .with_collider(ColliderShape::new(vec![
                ColliderRect::new(-6, -2, 12, 4),
                ColliderRect::new(-1, -14, 2, 12).tall().exact(),
            ])),
    );
    let wanderer = Arc::new(Archetype::named("wanderer").with_sprite(SpriteId(20)));
    let bird = Arc::new(Archetype::named("bird").with_sprite(SpriteId(30)));
    let lamp = Arc::new(
        Archetype::named("lamp")
            .with_sprite(SpriteId(40))
            .with_collider(ColliderShape::new(vec![ColliderRect::new(-1, -1, 2, 2)]))
            .with_light(
                LightSource {
                    radius: 5.0,
                    color: [255, 214, 160],
                    on_below: 0.4,
                },
                true,
            ),
    );
    let plate = Arc::new(Archetype::named("pressure_plate").with_trigger(TriggerArea {
        x: -1.0,
        y: -1.0,
        w: 2.0,
        h: 2.0,
    }));

    let mut scenario = Scenario::default();
    let mut next_id = 1u32;
    let size = layout.region_size as f32;
    for ry in 0..layout.regions_y {
        for rx in 0..layout.regions_x {
            let origin = Vec2::new(rx as f32 * size, ry as f32 * size);

            spawn(world, &mut next_id, |id| {
                Entity::new(id, origin + Vec2::new(size * 0.75, size * 0.7), tree.clone())
                    .with_flags(EntityFlags::CAN_COLLIDE_WITH | EntityFlags::STATIC_Y)
            })?;

            let heading = (rx * 7 + ry * 3) as f32 * 0.37 * TAU;
            let id = spawn(world, &mut next_id, |id| {
                Entity::new(id, origin + Vec2::splat(size * 0.4), wanderer.clone())
                    .with_velocity(Vec2::from_angle(heading) * 3.0)
                    .with_flags(EntityFlags::MOVABLE | EntityFlags::CAN_COLLIDE)
            })?;
            scenario.wanderers.push(id);

            if (rx + ry) % 3 == 0 {
                spawn(world, &mut next_id, |id| {
                    Entity::new(id, origin + Vec2::new(size * 0.2, size * 0.8), bird.clone())
                        .with_velocity(Vec2::new(1.5, -0.5))
                        .with_flags(
                            EntityFlags::MOVABLE | EntityFlags::CAN_COLLIDE | EntityFlags::FLYING,
                        )
                })?;
            }

            if (rx + ry) % 4 == 1 {
                spawn(world, &mut next_id, |id| {
                    Entity::new(id, origin + Vec2::new(size * 0.5, size * 0.2), lamp.clone())
                        .with_flags(EntityFlags::CAN_COLLIDE_WITH)
                })?;
            }
        }
    }

    let center = Vec2::new(
        layout.world_tiles_x() as f32 * 0.5,
        layout.world_tiles_y() as f32 * 0.5,
    );
    spawn(world, &mut next_id, |id| {
        Entity::new(id, center, plate).with_flags(EntityFlags::DECAL | EntityFlags::INTERACTIVE)
    })?;

    scenario.spawned = world.entity_count();
    info!(
        "Populated {} regions with {} entities ({} wanderers)",
        layout.regions_x * layout.regions_y,
        scenario.spawned,
        scenario.wanderers.len()
    );
    Ok(scenario)
}

fn spawn(
    world: &mut World,
    next_id: &mut u32,
    build: impl FnOnce(EntityId) -> Entity,
) -> Result<EntityId, WorldError> {
    let id = EntityId(*next_id);
    *next_id += 1;
    world.add_entity(build(id))
}

/// Turns every surviving wanderer by a quarter turn.
pub fn steer(world: &mut World, scenario: &Scenario) {
    for &id in &scenario.wanderers {
        if let Some(velocity) = world.entity(id).map(|e| e.velocity().perp())
            && world.set_velocity(id, velocity).is_err()
        {
            tracing::debug!("Wanderer {:?} vanished before steering", id);
        }
    }
}

/// Ambient light for a point in the day cycle: 1.0 at noon, 0.0 at midnight.
pub fn ambient_at(elapsed_s: f64) -> f32 {
    let phase = (elapsed_s as f32 / DAY_LENGTH_S).fract();
    0.5 + 0.5 * (phase * TAU).cos()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
