//! The [`World`]: region grid, entity arena and registries kept consistent.
//!
//! Every operation that can move an entity between regions, change whether it
//! contributes to collider bitmaps, or change its registry predicates goes
//! through here, so the region lists, the colliding sublists, the by-id map and
//! the derived registries never disagree.

use glam::Vec2;
use tracing::{debug, warn};

use crate::collider_gen;
use crate::entity::{ChatBubble, Entity, EntityArena, EntityId, EntityIndex};
use crate::error::WorldError;
use crate::flags::EntityFlags;
use crate::grid::RegionGrid;
use crate::layout::{ActiveBounds, GridLayout, RegionCoord};
use crate::region::{COLLIDER_DIRTY, Region, TILES_DIRTY};
use crate::registry::{Registries, RegistryKind};
use crate::resolver::Resolver;
use crate::settings::{ContractPolicy, WorldSettings};
use crate::shape::PixelRect;
use crate::tile::Tile;

/// Where an entity ended up after a position change.
#[derive(Debug)]
pub enum RegionSwitch {
    /// Still in the same region.
    Stayed(RegionCoord),
    /// Moved into another loaded region.
    Moved {
        /// Previous region.
        from: RegionCoord,
        /// New region.
        to: RegionCoord,
    },
    /// The destination region is not loaded; the entity was released from the
    /// world and is handed back.
    Released(Entity),
}

/// The spatial simulation state.
#[derive(Debug)]
pub struct World {
    pub(crate) settings: WorldSettings,
    pub(crate) grid: RegionGrid,
    pub(crate) arena: EntityArena,
    pub(crate) registries: Registries,
    pub(crate) resolver: Resolver,
    pub(crate) ambient_light: f32,
    pub(crate) elapsed: f64,
}

impl World {
    /// Creates an empty world with no regions loaded.
    pub fn new(settings: WorldSettings) -> Self {
        let resolver = Resolver::from_layout(&settings.layout, settings.resolver);
        Self {
            grid: RegionGrid::new(settings.layout),
            arena: EntityArena::new(),
            registries: Registries::new(),
            resolver,
            ambient_light: 1.0,
            elapsed: 0.0,
            settings,
        }
    }

    /// Construction settings.
    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Grid geometry.
    pub fn layout(&self) -> &GridLayout {
        self.grid.layout()
    }

    /// The region grid (also the resolver's obstruction map).
    pub fn grid(&self) -> &RegionGrid {
        &self.grid
    }

    /// Seconds simulated so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    // -----------------------------------------------------------------------
    // Regions
    // -----------------------------------------------------------------------

    /// Region owning a continuous world position, clamped into the grid.
    pub fn region_coord_of(&self, world_x: f32, world_y: f32) -> RegionCoord {
        self.layout().region_coord_of(world_x, world_y)
    }

    fn check_in_grid(&self, coord: RegionCoord) -> Result<(), WorldError> {
        if self.layout().in_grid(coord) {
            Ok(())
        } else {
            Err(WorldError::OutOfRange {
                coord,
                regions_x: self.layout().regions_x,
                regions_y: self.layout().regions_y,
            })
        }
    }

    /// The loaded region at `coord`.
    ///
    /// Fails with [`WorldError::OutOfRange`] outside the grid and
    /// [`WorldError::RegionNotLoaded`] for an empty slot.
    pub fn region(&self, coord: RegionCoord) -> Result<&Region, WorldError> {
        self.check_in_grid(coord)?;
        self.grid
            .get(coord)
            .ok_or(WorldError::RegionNotLoaded(coord))
    }

    /// The loaded region at `coord`, or `None`.
    pub fn region_or_none(&self, coord: RegionCoord) -> Option<&Region> {
        self.grid.get(coord)
    }

    /// Minimal rectangle holding every loaded region.
    pub fn active_bounds(&self) -> Option<ActiveBounds> {
        self.grid.active_bounds()
    }

    /// Loads a region from decompressed tile bytes, or filled with ground.
    ///
    /// Loading over an already-loaded region evicts it first; the entities it
    /// held are returned. The region and its neighbors are marked for collider
    /// regeneration.
    pub fn load_region(
        &mut self,
        coord: RegionCoord,
        tiles: Option<&[u8]>,
    ) -> Result<Vec<Entity>, WorldError> {
        self.check_in_grid(coord)?;
        let layout = *self.layout();
        let region = match tiles {
            Some(bytes) => {
                let expected = layout.region_tile_count();
                if bytes.len() != expected {
                    return Err(WorldError::InvalidTileData {
                        expected,
                        actual: bytes.len(),
                    });
                }
                let (region, unknown) = Region::from_bytes(coord, &layout, bytes);
                if unknown > 0 {
                    warn!(
                        "Region ({}, {}) has {} unknown tile bytes, decoded as void",
                        coord.x, coord.y, unknown
                    );
                }
                region
            }
            None => Region::new(coord, &layout),
        };

        let mut released = Vec::new();
        if self.grid.is_loaded(coord) {
            if cfg!(debug_assertions) {
                warn!(
                    "Region ({}, {}) loaded while already loaded; evicting the old one",
                    coord.x, coord.y
                );
            }
            released = self.evict_one(coord);
        }

        if self.grid.insert(region).is_err() {
            // Unreachable after the grid check, but keep the contract visible.
            return Err(WorldError::OutOfRange {
                coord,
                regions_x: layout.regions_x,
                regions_y: layout.regions_y,
            });
        }
        self.grid.mark_neighborhood_dirty(coord, COLLIDER_DIRTY);
        debug!("Loaded region ({}, {})", coord.x, coord.y);
        Ok(released)
    }

    /// Evicts regions, releasing every entity they contain.
    ///
    /// Coordinates that are outside the grid or not loaded are skipped.
    pub fn evict_regions(&mut self, coords: &[RegionCoord]) -> Vec<Entity> {
        let mut released = Vec::new();
        for &coord in coords {
            if !self.grid.is_loaded(coord) {
                debug!("Skipping eviction of unloaded region ({}, {})", coord.x, coord.y);
                continue;
            }
            released.extend(self.evict_one(coord));
        }
        released
    }

    fn evict_one(&mut self, coord: RegionCoord) -> Vec<Entity> {
        let Some(mut region) = self.grid.remove(coord) else {
            return Vec::new();
        };
        let released: Vec<Entity> = region
            .drain_entities()
            .into_iter()
            .filter_map(|index| self.release(index))
            .collect();
        self.grid.mark_neighborhood_dirty(coord, COLLIDER_DIRTY);
        debug!(
            "Evicted region ({}, {}), released {} entities",
            coord.x,
            coord.y,
            released.len()
        );
        released
    }

    // -----------------------------------------------------------------------
    // Tiles
    // -----------------------------------------------------------------------

    fn locate_tile(&self, tx: i32, ty: i32) -> Result<(RegionCoord, usize, usize), WorldError> {
        let coord = self
            .layout()
            .region_of_tile(tx, ty)
            .ok_or(WorldError::TileOutOfBounds(tx, ty))?;
        let size = self.layout().region_size as i32;
        Ok((
            coord,
            (tx - coord.x * size) as usize,
            (ty - coord.y * size) as usize,
        ))
    }

    /// Sets a tile and returns the previous one.
    ///
    /// When the blocking property changes, every region whose bitmap may cover
    /// the tile (including neighbors across borders) is marked for collider
    /// regeneration.
    pub fn set_tile(&mut self, tx: i32, ty: i32, tile: Tile) -> Result<Tile, WorldError> {
        let (coord, lx, ly) = self.locate_tile(tx, ty)?;
        let region = self
            .grid
            .get_mut(coord)
            .ok_or(WorldError::RegionNotLoaded(coord))?;
        let previous = region
            .set_tile(lx, ly, tile)
            .ok_or(WorldError::TileOutOfBounds(tx, ty))?;

        if previous.is_blocking() != tile.is_blocking() {
            let (tw, th) = (
                self.layout().tile_width as i32,
                self.layout().tile_height as i32,
            );
            let border = PixelRect::new((tx - 1) * tw, (ty - 1) * th, 3 * tw, 3 * th);
            self.grid.mark_pixels_dirty(border, COLLIDER_DIRTY);
        }
        Ok(previous)
    }

    /// The tile at integer tile coordinates, `None` outside the map or in an
    /// unloaded region.
    pub fn tile_at(&self, tx: i32, ty: i32) -> Option<Tile> {
        let (coord, lx, ly) = self.locate_tile(tx, ty).ok()?;
        self.grid.get(coord).map(|r| r.tile(lx, ly))
    }

    /// The tile under a continuous world position.
    pub fn tile_under(&self, position: Vec2) -> Option<Tile> {
        tile_under(&self.grid, position)
    }

    /// Terrain elevation (pixels) under a continuous world position.
    pub fn elevation_at(&self, position: Vec2) -> i32 {
        self.tile_under(position).map_or(0, Tile::elevation)
    }

    /// Whether the entity stands in water. Flying entities never do.
    pub fn is_entity_in_water(&self, id: EntityId) -> Result<bool, WorldError> {
        let entity = self.entity(id).ok_or(WorldError::UnknownEntity(id))?;
        Ok(!entity.is_flying()
            && self
                .tile_under(entity.position())
                .is_some_and(Tile::is_water))
    }

    /// Drains the tiles-dirty flag, returning the regions that had it.
    pub fn take_dirty_tiles(&mut self) -> Vec<RegionCoord> {
        let coords = self.grid.dirty_coords(TILES_DIRTY);
        for &coord in &coords {
            if let Some(region) = self.grid.get_mut(coord) {
                region.clear_dirty(TILES_DIRTY);
            }
        }
        coords
    }

    /// Regenerates every dirty collider bitmap now. Returns how many were
    /// regenerated. The tick does this automatically.
    pub fn regenerate_colliders(&mut self) -> usize {
        collider_gen::regenerate_dirty(&mut self.grid, &self.arena, &self.settings.footprint)
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Number of registered entities.
    pub fn entity_count(&self) -> usize {
        self.registries.len()
    }

    /// Looks up an entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registries
            .index_of(id)
            .and_then(|index| self.arena.get(index))
    }

    /// Adds an entity to the region owning its position and every registry
    /// whose predicate it satisfies.
    ///
    /// Fails with [`WorldError::RegionNotLoaded`] when that region is not
    /// loaded. A duplicate id fails under [`ContractPolicy::Strict`]; under
    /// [`ContractPolicy::Lenient`] the old entity is removed first.
    pub fn add_entity(&mut self, entity: Entity) -> Result<EntityId, WorldError> {
        let id = entity.id();
        let position = entity.position();
        let coord = self.region_coord_of(position.x, position.y);
        if !self.grid.is_loaded(coord) {
            return Err(WorldError::RegionNotLoaded(coord));
        }

        if self.registries.index_of(id).is_some() {
            match self.settings.contract_policy {
                ContractPolicy::Strict => return Err(WorldError::DuplicateEntity(id)),
                ContractPolicy::Lenient => {
                    warn!("Duplicate entity id {:?}; replacing the existing entity", id);
                    self.remove_entity(id);
                }
            }
        }

        let index = self.arena.insert(entity);
        self.registries.insert_id(id, index);
        self.attach(index, coord);
        Ok(id)
    }

    /// Removes an entity from its region and every registry, handing it back.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.registries.index_of(id)?;
        self.detach(index);
        self.release(index)
    }

    /// Moves an entity to `(x, y)` and re-homes it.
    ///
    /// If the destination region is loaded the entity is moved there (or stays
    /// put); otherwise it is released from the world entirely and returned.
    pub fn switch_entity_region(
        &mut self,
        id: EntityId,
        x: f32,
        y: f32,
    ) -> Result<RegionSwitch, WorldError> {
        let index = self
            .registries
            .index_of(id)
            .ok_or(WorldError::UnknownEntity(id))?;
        Ok(self.relocate(index, Vec2::new(x, y)))
    }

    /// Places an entity at `position`, ignoring obstruction.
    pub fn teleport_entity(
        &mut self,
        id: EntityId,
        position: Vec2,
    ) -> Result<RegionSwitch, WorldError> {
        self.switch_entity_region(id, position.x, position.y)
    }

    /// Sets an entity's velocity.
    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec2) -> Result<(), WorldError> {
        let index = self
            .registries
            .index_of(id)
            .ok_or(WorldError::UnknownEntity(id))?;
        if let Some(entity) = self.arena.get_mut(index) {
            entity.set_velocity(velocity);
        }
        Ok(())
    }

    /// Replaces an entity's flags, updating registries and the colliding
    /// sublist of its region.
    pub fn set_flags(&mut self, id: EntityId, flags: EntityFlags) -> Result<(), WorldError> {
        let index = self
            .registries
            .index_of(id)
            .ok_or(WorldError::UnknownEntity(id))?;
        let Some(entity) = self.arena.get_mut(index) else {
            return Err(WorldError::UnknownEntity(id));
        };
        let was_colliding = entity.is_colliding();
        entity.set_flags(flags);
        self.registries.sync(index, entity);
        let colliding = entity.is_colliding();
        let region = entity.region;

        if was_colliding != colliding {
            if let Some(coord) = region
                && let Some(region) = self.grid.get_mut(coord)
            {
                region.set_colliding(index, colliding);
            }
            self.mark_reach_dirty(index, true);
        }
        Ok(())
    }

    /// Attaches a chat bubble that disappears after `seconds`.
    pub fn say(
        &mut self,
        id: EntityId,
        text: impl Into<String>,
        seconds: f32,
    ) -> Result<(), WorldError> {
        let index = self
            .registries
            .index_of(id)
            .ok_or(WorldError::UnknownEntity(id))?;
        if let Some(entity) = self.arena.get_mut(index) {
            entity.chat = Some(ChatBubble {
                text: text.into(),
                remaining: seconds.max(0.0),
            });
        }
        Ok(())
    }

    /// Ambient light level, `0.0` (dark) to `1.0` (daylight).
    pub fn ambient_light(&self) -> f32 {
        self.ambient_light
    }

    /// Sets the ambient light level used to switch entity lights.
    pub fn set_ambient_light(&mut self, level: f32) {
        self.ambient_light = level.clamp(0.0, 1.0);
    }

    /// Entities in a derived registry.
    pub fn registry(&self, kind: RegistryKind) -> impl Iterator<Item = &Entity> {
        self.registries
            .list(kind)
            .as_slice()
            .iter()
            .filter_map(|&index| self.arena.get(index))
    }

    /// Ids of every entity physically inside a region.
    pub fn region_entity_ids(&self, coord: RegionCoord) -> Vec<EntityId> {
        self.ids_of(self.grid.get(coord).map(Region::entities).unwrap_or_default())
    }

    /// Ids of the entities that may contribute to the bitmap of `coord`:
    /// the colliding sublists of the region and its 8 neighbors.
    pub fn colliding_ids_near(&self, coord: RegionCoord) -> Vec<EntityId> {
        coord
            .with_neighbors()
            .filter_map(|c| self.grid.get(c))
            .flat_map(|region| self.ids_of(region.colliding()))
            .collect()
    }

    fn ids_of(&self, indices: &[EntityIndex]) -> Vec<EntityId> {
        indices
            .iter()
            .filter_map(|&index| self.arena.get(index).map(Entity::id))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Internal bookkeeping
    // -----------------------------------------------------------------------

    /// Pixel rectangle an entity's collider can affect, if it is colliding.
    pub(crate) fn collider_reach(&self, index: EntityIndex) -> Option<PixelRect> {
        let entity = self.arena.get(index)?;
        if !entity.is_colliding() {
            return None;
        }
        let shape = entity.collider()?;
        let (px, py) = self.layout().pixel_of(entity.position());
        Some(
            self.settings
                .footprint
                .inflate_bounds(shape.bounds().translate(px, py)),
        )
    }

    /// Marks regions under the entity's collider reach dirty. With `always`,
    /// marks even if the entity is not currently colliding (used right after
    /// it stopped colliding), using its shape bounds if it has one.
    fn mark_reach_dirty(&mut self, index: EntityIndex, always: bool) {
        let reach = if always {
            self.arena.get(index).and_then(|entity| {
                let shape = entity.collider()?;
                let (px, py) = self.layout().pixel_of(entity.position());
                Some(
                    self.settings
                        .footprint
                        .inflate_bounds(shape.bounds().translate(px, py)),
                )
            })
        } else {
            self.collider_reach(index)
        };
        if let Some(rect) = reach {
            self.grid.mark_pixels_dirty(rect, COLLIDER_DIRTY);
        }
    }

    /// Puts an arena entity into a loaded region and syncs its registries.
    fn attach(&mut self, index: EntityIndex, coord: RegionCoord) {
        let Some(entity) = self.arena.get_mut(index) else {
            return;
        };
        entity.region = Some(coord);
        self.registries.sync(index, entity);
        let colliding = entity.is_colliding();
        if let Some(region) = self.grid.get_mut(coord) {
            region.attach(index, colliding);
        }
        if colliding {
            self.mark_reach_dirty(index, false);
        }
    }

    /// Takes an entity out of its region lists, invalidating bitmaps it
    /// contributed to.
    fn detach(&mut self, index: EntityIndex) {
        self.mark_reach_dirty(index, false);
        let Some(coord) = self.arena.get_mut(index).and_then(|e| e.region.take()) else {
            return;
        };
        if let Some(region) = self.grid.get_mut(coord)
            && !region.detach(index)
            && cfg!(debug_assertions)
        {
            warn!(
                "Entity slot {:?} missing from region ({}, {})",
                index, coord.x, coord.y
            );
        }
    }

    /// Removes a detached entity from the arena, registries and id map.
    fn release(&mut self, index: EntityIndex) -> Option<Entity> {
        let mut entity = self.arena.remove(index)?;
        self.registries.clear(index, &mut entity);
        self.registries.remove_id(entity.id());
        entity.region = None;
        Some(entity)
    }

    /// Moves an entity and re-homes it, releasing it if the destination
    /// region is not loaded.
    pub(crate) fn relocate(&mut self, index: EntityIndex, position: Vec2) -> RegionSwitch {
        let to = self.region_coord_of(position.x, position.y);
        let from = self.arena.get(index).and_then(Entity::region);

        self.mark_reach_dirty(index, false);
        if let Some(entity) = self.arena.get_mut(index) {
            entity.set_position(position);
        }

        if from == Some(to) {
            self.mark_reach_dirty(index, false);
            return RegionSwitch::Stayed(to);
        }

        self.detach(index);
        if self.grid.is_loaded(to) {
            self.attach(index, to);
            return RegionSwitch::Moved {
                from: from.unwrap_or(to),
                to,
            };
        }

        match self.release(index) {
            Some(entity) => {
                debug!(
                    "Entity {:?} left the loaded area at ({}, {}); released",
                    entity.id(),
                    position.x,
                    position.y
                );
                RegionSwitch::Released(entity)
            }
            None => RegionSwitch::Stayed(to),
        }
    }
}

/// The tile under a continuous world position in a grid.
pub(crate) fn tile_under(grid: &RegionGrid, position: Vec2) -> Option<Tile> {
    if !position.is_finite() {
        return None;
    }
    let tx = position.x.floor() as i32;
    let ty = position.y.floor() as i32;
    let layout = grid.layout();
    let coord = layout.region_of_tile(tx, ty)?;
    let size = layout.region_size as i32;
    grid.get(coord)
        .map(|r| r.tile((tx - coord.x * size) as usize, (ty - coord.y * size) as usize))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[path = "world_tests.rs"]
mod tests;
