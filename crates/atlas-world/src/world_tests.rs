//! Tests for the world facade and the tick.

use std::sync::Arc;

use glam::Vec2;

use super::*;
use crate::capability::{Archetype, LightSource, SpriteId, TriggerArea};
use crate::region::{MASK_ALL, MASK_GROUND};
use crate::resolver::ObstructionMap;
use crate::settings::ResolverConfig;
use crate::shape::{ColliderRect, ColliderShape, Footprint};
use crate::tick::{TriggerEdge, TriggerEvent};

fn settings(policy: ContractPolicy) -> WorldSettings {
    WorldSettings {
        layout: GridLayout {
            regions_x: 3,
            regions_y: 3,
            region_size: 8,
            tile_width: 4,
            tile_height: 2,
        },
        footprint: Footprint::default(),
        resolver: ResolverConfig::default(),
        contract_policy: policy,
    }
}

fn coord(x: i32, y: i32) -> RegionCoord {
    RegionCoord::new(x, y)
}

fn loaded_world() -> World {
    let mut world = World::new(settings(ContractPolicy::Strict));
    for y in 0..3 {
        for x in 0..3 {
            world.load_region(coord(x, y), None).unwrap();
        }
    }
    world.regenerate_colliders();
    world
}

fn walker(id: u32, position: Vec2) -> Entity {
    let kind = Arc::new(Archetype::named("walker").with_sprite(SpriteId(1)));
    Entity::new(EntityId(id), position, kind)
        .with_flags(EntityFlags::MOVABLE | EntityFlags::CAN_COLLIDE)
}

fn block(id: u32, position: Vec2) -> Entity {
    let shape = ColliderShape::new(vec![ColliderRect::new(-2, -1, 4, 2)]);
    let kind = Arc::new(Archetype::named("block").with_collider(shape));
    Entity::new(EntityId(id), position, kind).with_flags(EntityFlags::CAN_COLLIDE_WITH)
}

fn post(id: u32, position: Vec2, rect: ColliderRect) -> Entity {
    let kind = Arc::new(Archetype::named("post").with_collider(ColliderShape::new(vec![rect])));
    Entity::new(EntityId(id), position, kind).with_flags(EntityFlags::CAN_COLLIDE_WITH)
}

fn pixel_mask(world: &World, position: Vec2) -> u8 {
    let (px, py) = world.layout().pixel_of(position);
    world.grid().mask_at(px, py)
}

fn run_ticks(world: &mut World, ticks: usize, delta: f32) -> Vec<(usize, TriggerEvent)> {
    let mut events = Vec::new();
    for tick in 0..ticks {
        world.tick(delta, |event| events.push((tick, event)));
    }
    events
}

// ---- Regions ----

#[test]
fn test_region_queries_distinguish_out_of_range_and_unloaded() {
    let world = World::new(settings(ContractPolicy::Strict));
    assert_eq!(
        world.region(coord(3, 0)).unwrap_err(),
        WorldError::OutOfRange {
            coord: coord(3, 0),
            regions_x: 3,
            regions_y: 3,
        }
    );
    assert_eq!(
        world.region(coord(1, 1)).unwrap_err(),
        WorldError::RegionNotLoaded(coord(1, 1))
    );
    assert!(world.region_or_none(coord(-1, 0)).is_none());
    assert!(world.region_or_none(coord(1, 1)).is_none());
}

#[test]
fn test_region_coord_of_clamps_into_grid() {
    let world = World::new(settings(ContractPolicy::Strict));
    assert_eq!(world.region_coord_of(9.0, 17.0), coord(1, 2));
    assert_eq!(world.region_coord_of(-3.0, 100.0), coord(0, 2));
}

#[test]
fn test_load_region_validates_tile_data() {
    let mut world = World::new(settings(ContractPolicy::Strict));
    let err = world.load_region(coord(0, 0), Some(&[1; 10])).unwrap_err();
    assert_eq!(
        err,
        WorldError::InvalidTileData {
            expected: 64,
            actual: 10,
        }
    );
    assert!(matches!(
        world.load_region(coord(0, 3), None),
        Err(WorldError::OutOfRange { .. })
    ));
    assert_eq!(world.active_bounds(), None);
}

#[test]
fn test_load_region_decodes_bytes_and_unknown_as_void() {
    let mut world = World::new(settings(ContractPolicy::Strict));
    let mut bytes = vec![Tile::Water.to_byte(); 64];
    bytes[9] = 77;
    world.load_region(coord(1, 0), Some(&bytes)).unwrap();

    assert_eq!(world.tile_at(8, 0), Some(Tile::Water));
    assert_eq!(world.tile_at(9, 1), Some(Tile::None));
    assert_eq!(world.tile_at(0, 0), None, "unloaded region");
    assert_eq!(world.tile_at(-1, 0), None, "outside the map");
}

#[test]
fn test_load_marks_neighbors_dirty_and_tracks_active_bounds() {
    let mut world = loaded_world();
    assert!(world.grid().dirty_coords(COLLIDER_DIRTY).is_empty());

    world.evict_regions(&[coord(1, 1)]);
    let mut dirty = world.grid().dirty_coords(COLLIDER_DIRTY);
    dirty.sort();
    assert_eq!(dirty.len(), 8, "every loaded neighbor of the evicted region");

    world.load_region(coord(1, 1), None).unwrap();
    assert_eq!(world.grid().dirty_coords(COLLIDER_DIRTY).len(), 9);

    world.evict_regions(&[coord(2, 2), coord(2, 1), coord(2, 0), coord(5, 5)]);
    let bounds = world.active_bounds().unwrap();
    assert_eq!(bounds.min, coord(0, 0));
    assert_eq!(bounds.max, coord(1, 2));
}

#[test]
fn test_walkable_region_bitmap_is_all_zero() {
    let world = loaded_world();
    let region = world.region(coord(0, 0)).unwrap();
    assert_eq!(region.collider().len(), 8 * 8 * 4 * 2);
    assert!(region.collider().iter().all(|&b| b == 0));
}

// ---- Tiles ----

#[test]
fn test_set_tile_updates_tile_and_dirty_flags() {
    let mut world = loaded_world();
    world.take_dirty_tiles();

    let previous = world.set_tile(3, 4, Tile::Ice).unwrap();
    assert_eq!(previous, Tile::Ground);
    assert_eq!(world.tile_at(3, 4), Some(Tile::Ice));
    assert_eq!(world.take_dirty_tiles(), vec![coord(0, 0)]);
    assert!(world.take_dirty_tiles().is_empty());
    assert!(
        world.grid().dirty_coords(COLLIDER_DIRTY).is_empty(),
        "walkable to walkable does not touch colliders"
    );

    assert_eq!(
        world.set_tile(24, 0, Tile::Ice).unwrap_err(),
        WorldError::TileOutOfBounds(24, 0)
    );
}

#[test]
fn test_wall_tile_paints_one_block_and_crosses_border() {
    let mut world = loaded_world();
    world.set_tile(7, 2, Tile::WallHorizontal).unwrap();

    let mut dirty = world.grid().dirty_coords(COLLIDER_DIRTY);
    dirty.sort();
    assert_eq!(dirty, vec![coord(0, 0), coord(1, 0)]);

    assert_eq!(world.regenerate_colliders(), 2);
    let left = world.region(coord(0, 0)).unwrap();
    let painted: Vec<usize> = left
        .collider()
        .iter()
        .enumerate()
        .filter(|&(_, &b)| b != 0)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(painted.len(), 4 * 2);
    for i in painted {
        let (x, y) = (i % 32, i / 32);
        assert!((28..32).contains(&x) && (4..6).contains(&y));
        assert_eq!(left.collider()[i], MASK_ALL);
    }
    assert!(world.region(coord(1, 0)).unwrap().collider().iter().all(|&b| b == 0));
}

#[test]
fn test_set_tile_in_unloaded_region_fails() {
    let mut world = World::new(settings(ContractPolicy::Strict));
    assert_eq!(
        world.set_tile(0, 0, Tile::Water).unwrap_err(),
        WorldError::RegionNotLoaded(coord(0, 0))
    );
}

// ---- Entities ----

#[test]
fn test_add_entity_requires_loaded_region() {
    let mut world = World::new(settings(ContractPolicy::Strict));
    world.load_region(coord(0, 0), None).unwrap();
    let err = world.add_entity(walker(1, Vec2::new(12.0, 2.0))).unwrap_err();
    assert_eq!(err, WorldError::RegionNotLoaded(coord(1, 0)));
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn test_add_entity_populates_region_and_registries() {
    let mut world = loaded_world();
    let id = world.add_entity(walker(1, Vec2::new(10.0, 3.0))).unwrap();

    assert_eq!(world.region_entity_ids(coord(1, 0)), vec![id]);
    assert_eq!(world.entity(id).unwrap().region(), Some(coord(1, 0)));
    assert_eq!(world.registry(RegistryKind::Moving).count(), 1);
    assert_eq!(world.registry(RegistryKind::Drawable).count(), 1);
    assert_eq!(world.registry(RegistryKind::Light).count(), 0);
}

#[test]
fn test_duplicate_id_strict_is_error() {
    let mut world = loaded_world();
    world.add_entity(walker(1, Vec2::new(1.0, 1.0))).unwrap();
    let err = world.add_entity(walker(1, Vec2::new(2.0, 2.0))).unwrap_err();
    assert_eq!(err, WorldError::DuplicateEntity(EntityId(1)));
    assert_eq!(world.entity(EntityId(1)).unwrap().position(), Vec2::new(1.0, 1.0));
}

#[test]
fn test_duplicate_id_lenient_replaces() {
    let mut world = World::new(settings(ContractPolicy::Lenient));
    for y in 0..3 {
        for x in 0..3 {
            world.load_region(coord(x, y), None).unwrap();
        }
    }
    world.add_entity(walker(1, Vec2::new(1.0, 1.0))).unwrap();
    world.add_entity(walker(1, Vec2::new(20.0, 20.0))).unwrap();

    assert_eq!(world.entity_count(), 1);
    assert_eq!(world.entity(EntityId(1)).unwrap().position(), Vec2::new(20.0, 20.0));
    assert!(world.region_entity_ids(coord(0, 0)).is_empty());
    assert_eq!(world.region_entity_ids(coord(2, 2)), vec![EntityId(1)]);
    assert_eq!(world.registry(RegistryKind::Moving).count(), 1);
}

#[test]
fn test_remove_entity_detaches_everywhere() {
    let mut world = loaded_world();
    world.add_entity(walker(1, Vec2::new(1.0, 1.0))).unwrap();
    world.add_entity(block(2, Vec2::new(2.0, 2.0))).unwrap();
    world.regenerate_colliders();

    let removed = world.remove_entity(EntityId(2)).unwrap();
    assert_eq!(removed.id(), EntityId(2));
    assert_eq!(removed.region(), None);
    assert!(world.remove_entity(EntityId(2)).is_none());
    assert!(world.colliding_ids_near(coord(0, 0)).is_empty());
    assert_eq!(world.region_entity_ids(coord(0, 0)), vec![EntityId(1)]);
    assert!(world.grid().dirty_coords(COLLIDER_DIRTY).contains(&coord(0, 0)));

    world.regenerate_colliders();
    assert!(world.region(coord(0, 0)).unwrap().collider().iter().all(|&b| b == 0));
}

#[test]
fn test_evict_then_reload_does_not_resurrect() {
    let mut world = loaded_world();
    world.add_entity(walker(1, Vec2::new(1.0, 1.0))).unwrap();
    world.add_entity(block(2, Vec2::new(3.0, 3.0))).unwrap();
    world.add_entity(walker(3, Vec2::new(12.0, 1.0))).unwrap();

    let released = world.evict_regions(&[coord(0, 0)]);
    let mut ids: Vec<_> = released.iter().map(Entity::id).collect();
    ids.sort();
    assert_eq!(ids, vec![EntityId(1), EntityId(2)]);
    assert!(released.iter().all(|e| e.region().is_none()));

    world.load_region(coord(0, 0), None).unwrap();
    assert!(world.region_entity_ids(coord(0, 0)).is_empty());
    assert!(world.entity(EntityId(1)).is_none());
    assert_eq!(world.entity_count(), 1);
    assert_eq!(world.registry(RegistryKind::Moving).count(), 1);
}

#[test]
fn test_load_over_loaded_region_releases_its_entities() {
    let mut world = loaded_world();
    world.add_entity(walker(1, Vec2::new(1.0, 1.0))).unwrap();
    let released = world.load_region(coord(0, 0), None).unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn test_switch_region_moves_or_releases() {
    let mut world = World::new(settings(ContractPolicy::Strict));
    world.load_region(coord(0, 0), None).unwrap();
    world.load_region(coord(1, 0), None).unwrap();
    let id = world.add_entity(walker(1, Vec2::new(1.0, 1.0))).unwrap();

    match world.switch_entity_region(id, 2.0, 2.0).unwrap() {
        RegionSwitch::Stayed(c) => assert_eq!(c, coord(0, 0)),
        other => panic!("unexpected {other:?}"),
    }
    match world.switch_entity_region(id, 9.0, 2.0).unwrap() {
        RegionSwitch::Moved { from, to } => {
            assert_eq!(from, coord(0, 0));
            assert_eq!(to, coord(1, 0));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(world.region_entity_ids(coord(0, 0)).is_empty());
    assert_eq!(world.region_entity_ids(coord(1, 0)), vec![id]);

    match world.teleport_entity(id, Vec2::new(20.0, 2.0)).unwrap() {
        RegionSwitch::Released(entity) => assert_eq!(entity.id(), id),
        other => panic!("unexpected {other:?}"),
    }
    assert!(world.entity(id).is_none());
    assert!(world.region_entity_ids(coord(1, 0)).is_empty());
    assert_eq!(world.registry(RegistryKind::Moving).count(), 0);
    assert_eq!(
        world.switch_entity_region(id, 1.0, 1.0).unwrap_err(),
        WorldError::UnknownEntity(id)
    );
}

#[test]
fn test_only_colliding_entities_contribute_to_neighbors() {
    let mut world = loaded_world();
    // Pixel (30, 8): the inflated rect reaches past the border at x = 32.
    let spot = Vec2::new(7.5, 4.0);
    world.add_entity(block(1, spot)).unwrap();
    world.add_entity(walker(2, spot)).unwrap();
    world.add_entity(block(3, spot).with_flags(EntityFlags::NONE)).unwrap();
    world.regenerate_colliders();

    assert_eq!(world.colliding_ids_near(coord(1, 0)), vec![EntityId(1)]);
    assert_eq!(world.colliding_ids_near(coord(1, 1)), vec![EntityId(1)]);
    assert!(world.colliding_ids_near(coord(2, 2)).is_empty());
    let mut all = world.region_entity_ids(coord(0, 0));
    all.sort();
    assert_eq!(all, vec![EntityId(1), EntityId(2), EntityId(3)]);
    assert_eq!(world.grid().mask_at(33, 8), MASK_GROUND);

    world.set_flags(EntityId(1), EntityFlags::NONE).unwrap();
    world.regenerate_colliders();
    assert!(world.colliding_ids_near(coord(1, 0)).is_empty());
    assert!(world.region(coord(1, 0)).unwrap().collider().iter().all(|&b| b == 0));

    world.set_flags(EntityId(3), EntityFlags::CAN_COLLIDE_WITH).unwrap();
    world.regenerate_colliders();
    assert_eq!(world.colliding_ids_near(coord(1, 0)), vec![EntityId(3)]);
    assert_eq!(world.grid().mask_at(33, 8), MASK_GROUND);
}

#[test]
fn test_set_flags_reevaluates_membership() {
    let mut world = loaded_world();
    world.add_entity(walker(1, Vec2::new(1.0, 1.0))).unwrap();
    world.add_entity(block(2, Vec2::new(4.0, 4.0))).unwrap();
    world.regenerate_colliders();
    assert!(pixel_mask(&world, Vec2::new(4.0, 4.0)) & MASK_GROUND != 0);

    world
        .set_flags(EntityId(1), EntityFlags::MOVABLE | EntityFlags::HIDDEN)
        .unwrap();
    assert_eq!(world.registry(RegistryKind::Drawable).count(), 0);

    world.set_flags(EntityId(2), EntityFlags::NONE).unwrap();
    assert!(world.colliding_ids_near(coord(0, 0)).is_empty());
    assert_eq!(world.regenerate_colliders(), 1);
    assert_eq!(pixel_mask(&world, Vec2::new(4.0, 4.0)), 0);

    assert_eq!(
        world.set_flags(EntityId(9), EntityFlags::NONE).unwrap_err(),
        WorldError::UnknownEntity(EntityId(9))
    );
}

#[test]
fn test_moving_colliding_entity_invalidates_old_and_new_regions() {
    let mut world = loaded_world();
    world.add_entity(block(1, Vec2::new(4.0, 4.0))).unwrap();
    world.regenerate_colliders();

    world.teleport_entity(EntityId(1), Vec2::new(20.0, 4.0)).unwrap();
    let dirty = world.grid().dirty_coords(COLLIDER_DIRTY);
    assert!(dirty.contains(&coord(0, 0)));
    assert!(dirty.contains(&coord(2, 0)));

    world.regenerate_colliders();
    assert!(world.region(coord(0, 0)).unwrap().collider().iter().all(|&b| b == 0));
    assert!(pixel_mask(&world, Vec2::new(20.0, 4.0)) & MASK_GROUND != 0);
}

#[test]
fn test_far_off_map_teleport_degrades_to_edge_region() {
    let mut world = loaded_world();
    world.add_entity(block(1, Vec2::new(4.0, 4.0))).unwrap();
    world.regenerate_colliders();

    let switch = world.teleport_entity(EntityId(1), Vec2::new(1e12, 4.0)).unwrap();
    assert!(matches!(switch, RegionSwitch::Moved { to, .. } if to == coord(2, 0)));
    let switch = world.teleport_entity(EntityId(1), Vec2::new(-1e12, -1e12)).unwrap();
    assert!(matches!(switch, RegionSwitch::Moved { to, .. } if to == coord(0, 0)));

    world.tick(0.1, |_| {});
    assert!(world.grid().iter().all(|r| r.collider().iter().all(|&b| b == 0)));

    world.teleport_entity(EntityId(1), Vec2::new(4.0, 4.0)).unwrap();
    world.regenerate_colliders();
    assert!(pixel_mask(&world, Vec2::new(4.0, 4.0)) & MASK_GROUND != 0);
}

// ---- Tick ----

#[test]
fn test_non_collider_moves_by_velocity_times_delta() {
    let mut world = loaded_world();
    let ghost = walker(1, Vec2::new(3.0, 3.0))
        .with_flags(EntityFlags::MOVABLE)
        .with_velocity(Vec2::new(2.0, 1.0));
    world.add_entity(ghost).unwrap();

    let stats = world.tick(0.5, |_| {});
    assert_eq!(stats.moved, 1);
    assert_eq!(world.entity(EntityId(1)).unwrap().position(), Vec2::new(4.0, 3.5));
}

#[test]
fn test_water_halves_ground_speed_but_not_flight() {
    let mut world = loaded_world();
    world.set_tile(3, 3, Tile::Water).unwrap();
    let wader = walker(1, Vec2::new(3.5, 3.5))
        .with_flags(EntityFlags::MOVABLE)
        .with_velocity(Vec2::new(2.0, 1.0));
    let bird = walker(2, Vec2::new(3.5, 3.5))
        .with_flags(EntityFlags::MOVABLE | EntityFlags::FLYING)
        .with_velocity(Vec2::new(2.0, 1.0));
    world.add_entity(wader).unwrap();
    world.add_entity(bird).unwrap();

    world.tick(0.5, |_| {});
    assert_eq!(world.entity(EntityId(1)).unwrap().position(), Vec2::new(4.0, 3.75));
    assert_eq!(world.entity(EntityId(2)).unwrap().position(), Vec2::new(4.5, 4.0));
}

#[test]
fn test_collider_never_ends_in_blocking_pixel() {
    let mut world = loaded_world();
    for ty in 0..24 {
        world.set_tile(12, ty, Tile::WallVertical).unwrap();
    }
    world.add_entity(walker(1, Vec2::new(5.5, 5.5)).with_velocity(Vec2::new(8.0, 3.0))).unwrap();

    for _ in 0..30 {
        let stats = world.tick(0.1, |_| {});
        assert_eq!(stats.truncated_walks, 0);
        let position = world.entity(EntityId(1)).unwrap().position();
        assert_eq!(pixel_mask(&world, position) & MASK_GROUND, 0, "{position:?}");
        assert!(position.x < 12.0, "crossed the wall at {position:?}");
    }
    assert!(world.entity(EntityId(1)).unwrap().position().x >= 11.0);
}

#[test]
fn test_walking_out_of_loaded_area_releases() {
    let mut world = World::new(settings(ContractPolicy::Strict));
    world.load_region(coord(0, 0), None).unwrap();
    world.load_region(coord(1, 0), None).unwrap();
    let ghost = walker(1, Vec2::new(15.5, 4.0))
        .with_flags(EntityFlags::MOVABLE)
        .with_velocity(Vec2::new(10.0, 0.0));
    world.add_entity(ghost).unwrap();

    let stats = world.tick(0.1, |_| {});
    assert_eq!(stats.released, vec![EntityId(1)]);
    assert!(world.entity(EntityId(1)).is_none());
    assert_eq!(world.registry(RegistryKind::Moving).count(), 0);
}

#[test]
fn test_triggers_fire_once_per_transition() {
    let mut world = loaded_world();
    let plate = Archetype::named("plate").with_trigger(TriggerArea {
        x: -1.0,
        y: -1.0,
        w: 2.0,
        h: 2.0,
    });
    world
        .add_entity(Entity::new(EntityId(100), Vec2::new(12.0, 12.0), Arc::new(plate)))
        .unwrap();
    let runner = walker(1, Vec2::new(8.5, 12.0))
        .with_flags(EntityFlags::MOVABLE)
        .with_velocity(Vec2::new(10.0, 0.0));
    world.add_entity(runner).unwrap();

    let events = run_ticks(&mut world, 8, 0.1);
    let on = TriggerEvent {
        trigger: EntityId(100),
        edge: TriggerEdge::On,
    };
    let off = TriggerEvent {
        trigger: EntityId(100),
        edge: TriggerEdge::Off,
    };
    assert_eq!(events, vec![(2, on), (4, off)]);
    assert!(!world.entity(EntityId(100)).unwrap().trigger_active());
}

#[test]
fn test_derived_state_tracks_terrain_flight_and_light() {
    let mut world = loaded_world();
    world.set_tile(2, 2, Tile::Water).unwrap();
    let lamp = Archetype::named("lamp").with_light(
        LightSource {
            radius: 3.0,
            color: [255, 220, 160],
            on_below: 0.5,
        },
        false,
    );
    world
        .add_entity(Entity::new(EntityId(1), Vec2::new(2.5, 2.5), Arc::new(lamp)))
        .unwrap();
    let bird = walker(2, Vec2::new(2.5, 2.5)).with_flags(EntityFlags::FLYING);
    world.add_entity(bird).unwrap();

    world.tick(0.25, |_| {});
    let lamp = world.entity(EntityId(1)).unwrap().derived();
    assert!(lamp.in_water);
    assert_eq!(lamp.elevation, crate::tile::WATER_ELEVATION);
    assert!(!lamp.lit);
    assert!(world.is_entity_in_water(EntityId(1)).unwrap());
    assert!(!world.is_entity_in_water(EntityId(2)).unwrap());

    world.set_ambient_light(0.3);
    world.tick(0.25, |_| {});
    assert!(world.entity(EntityId(1)).unwrap().derived().lit);
    let bird = world.entity(EntityId(2)).unwrap().derived();
    assert!(!bird.in_water);
    assert_eq!(bird.elevation, 0);
    assert!((bird.bob - crate::tick::BOB_AMPLITUDE).abs() < 1e-4);
    assert_eq!(world.elevation_at(Vec2::new(2.5, 2.5)), crate::tile::WATER_ELEVATION);
}

#[test]
fn test_chat_bubble_expires() {
    let mut world = loaded_world();
    world.add_entity(walker(1, Vec2::new(1.0, 1.0))).unwrap();
    world.say(EntityId(1), "hello", 0.25).unwrap();

    world.tick(0.1, |_| {});
    assert_eq!(world.entity(EntityId(1)).unwrap().chat().unwrap().text, "hello");
    world.tick(0.1, |_| {});
    assert!(world.entity(EntityId(1)).unwrap().chat().is_some());
    world.tick(0.1, |_| {});
    assert!(world.entity(EntityId(1)).unwrap().chat().is_none());
    assert_eq!(
        world.say(EntityId(7), "nobody", 1.0).unwrap_err(),
        WorldError::UnknownEntity(EntityId(7))
    );
}

#[test]
fn test_tick_regenerates_dirty_colliders_first() {
    let mut world = loaded_world();
    world.set_tile(5, 5, Tile::WallVertical).unwrap();
    let stats = world.tick(0.1, |_| {});
    assert_eq!(stats.regenerated, 1);
    assert_eq!(pixel_mask(&world, Vec2::new(5.5, 5.5)), MASK_ALL);
    assert_eq!(world.tick(0.1, |_| {}).regenerated, 0);
}

#[test]
fn test_walker_stops_against_inflated_entity_collider() {
    let mut world = loaded_world();
    // Pixel (40, 10); inflated by the footprint the row-10 span starts at x = 35.
    world.add_entity(block(1, Vec2::new(10.0, 5.0))).unwrap();
    world.add_entity(walker(2, Vec2::new(5.0, 5.25)).with_velocity(Vec2::new(8.0, 0.0))).unwrap();

    run_ticks(&mut world, 10, 0.1);
    let position = world.entity(EntityId(2)).unwrap().position();
    assert!(position.x >= 34.0 / 4.0 && position.x < 35.0 / 4.0, "{position:?}");
    assert_eq!(position.y, 5.25);
    assert_eq!(pixel_mask(&world, position), 0);
}

#[test]
fn test_walker_stops_against_exact_entity_collider() {
    let mut world = loaded_world();
    // Exact rect covers pixels x 38..42, y 9..11 only.
    world.add_entity(post(1, Vec2::new(10.0, 5.0), ColliderRect::new(-2, -1, 4, 2).exact())).unwrap();
    world.add_entity(walker(2, Vec2::new(5.0, 5.25)).with_velocity(Vec2::new(8.0, 0.0))).unwrap();

    let stats = world.tick(1.0, |_| {});
    assert_eq!(stats.blocked, 1);
    let position = world.entity(EntityId(2)).unwrap().position();
    assert!(position.x >= 37.0 / 4.0 && position.x < 38.0 / 4.0, "{position:?}");
    assert_eq!(pixel_mask(&world, position), 0);
}

#[test]
fn test_flyer_passes_low_collider_but_not_tall_one() {
    let flyer = |id| {
        walker(id, Vec2::new(5.0, 5.25))
            .with_flags(EntityFlags::MOVABLE | EntityFlags::CAN_COLLIDE | EntityFlags::FLYING)
            .with_velocity(Vec2::new(8.0, 0.0))
    };

    let mut low = loaded_world();
    low.add_entity(block(1, Vec2::new(10.0, 5.0))).unwrap();
    low.add_entity(flyer(2)).unwrap();
    let stats = low.tick(1.0, |_| {});
    assert_eq!(stats.blocked, 0);
    assert_eq!(low.entity(EntityId(2)).unwrap().position(), Vec2::new(13.0, 5.25));

    let mut tall = loaded_world();
    tall.add_entity(post(1, Vec2::new(10.0, 5.0), ColliderRect::new(-2, -1, 4, 2).tall()))
        .unwrap();
    tall.add_entity(flyer(2)).unwrap();
    let stats = tall.tick(1.0, |_| {});
    assert_eq!(stats.blocked, 1);
    let position = tall.entity(EntityId(2)).unwrap().position();
    assert!(position.x >= 34.0 / 4.0 && position.x < 35.0 / 4.0, "{position:?}");
    assert_eq!(pixel_mask(&tall, position), 0);
}

#[test]
fn test_colliding_mover_is_not_blocked_by_itself() {
    let mut world = loaded_world();
    for ty in 0..24 {
        world.set_tile(12, ty, Tile::WallVertical).unwrap();
    }
    let cart = block(1, Vec2::new(8.5, 5.5))
        .with_flags(EntityFlags::MOVABLE | EntityFlags::CAN_COLLIDE | EntityFlags::CAN_COLLIDE_WITH)
        .with_velocity(Vec2::new(4.0, 0.0));
    world.add_entity(cart).unwrap();
    // Pixel (44, 19); its inflated rows start at y = 17 in the cart's column.
    world.add_entity(block(2, Vec2::new(11.0, 9.5))).unwrap();

    for _ in 0..20 {
        world.tick(0.1, |_| {});
        let position = world.entity(EntityId(1)).unwrap().position();
        assert!(position.x < 12.0, "crossed the wall at {position:?}");
    }
    let position = world.entity(EntityId(1)).unwrap().position();
    assert!(position.x >= 47.0 / 4.0, "stopped early at {position:?}");
    assert_eq!(world.tile_under(position), Some(Tile::Ground));

    // The cart still blocks other movers.
    world.regenerate_colliders();
    assert!(pixel_mask(&world, position) & MASK_GROUND != 0);

    // And is still blocked by other colliders: drive it into block 2.
    world.set_velocity(EntityId(1), Vec2::new(0.0, 4.0)).unwrap();
    run_ticks(&mut world, 20, 0.1);
    let position = world.entity(EntityId(1)).unwrap().position();
    assert!(
        position.y >= 16.0 / 2.0 && position.y < 17.0 / 2.0,
        "{position:?}"
    );
}

