//! Capability traits implemented per entity archetype.
//!
//! The spatial core never branches on concrete entity types. Instead each
//! archetype exposes the capabilities it has through [`EntityKind`], and the
//! registries and collider generator ask for them.

use crate::shape::ColliderShape;

/// Opaque handle into the renderer's sprite table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpriteId(pub u32);

/// A point light attached to an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSource {
    /// Radius in tiles.
    pub radius: f32,
    /// RGB color.
    pub color: [u8; 3],
    /// The light switches on once ambient light drops to this level or below.
    pub on_below: f32,
}

/// Trigger volume relative to the trigger entity's position, in tile units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerArea {
    /// Left edge offset.
    pub x: f32,
    /// Top edge offset.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl TriggerArea {
    /// Whether a world point lies inside the area anchored at `origin`.
    pub fn contains(&self, origin: glam::Vec2, point: glam::Vec2) -> bool {
        let local = point - origin;
        local.x >= self.x && local.x < self.x + self.w && local.y >= self.y && local.y < self.y + self.h
    }
}

/// Has a collider shape that may be rasterized into bitmaps.
pub trait Collidable {
    /// The immutable collider metadata.
    fn collider(&self) -> &ColliderShape;
}

/// Can be drawn by the rendering layer.
pub trait Drawable {
    /// Sprite to draw.
    fn sprite(&self) -> SpriteId;
}

/// Emits light.
pub trait Lightable {
    /// The light description.
    fn light(&self) -> LightSource;

    /// Whether the light also has a glow sprite drawn on top.
    fn has_light_sprite(&self) -> bool {
        false
    }
}

/// Reacts to other entities entering an area.
pub trait Triggerable {
    /// The activation area.
    fn trigger_area(&self) -> TriggerArea;
}

/// Capability lookup for an entity archetype.
pub trait EntityKind: std::fmt::Debug {
    /// Archetype name, for logs.
    fn name(&self) -> &str;

    /// Collision capability.
    fn as_collidable(&self) -> Option<&dyn Collidable> {
        None
    }

    /// Drawing capability.
    fn as_drawable(&self) -> Option<&dyn Drawable> {
        None
    }

    /// Lighting capability.
    fn as_lightable(&self) -> Option<&dyn Lightable> {
        None
    }

    /// Trigger capability.
    fn as_triggerable(&self) -> Option<&dyn Triggerable> {
        None
    }
}

/// Data-driven archetype built by the entity factory.
///
/// Each optional field enables the matching capability.
#[derive(Clone, Debug, Default)]
pub struct Archetype {
    /// Archetype name.
    pub name: String,
    /// Collider shape.
    pub collider: Option<ColliderShape>,
    /// Sprite.
    pub sprite: Option<SpriteId>,
    /// Light.
    pub light: Option<LightSource>,
    /// Draw a glow sprite for the light.
    pub light_sprite: bool,
    /// Trigger area.
    pub trigger: Option<TriggerArea>,
}

impl Archetype {
    /// An archetype with no capabilities.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a collider shape.
    pub fn with_collider(mut self, shape: ColliderShape) -> Self {
        self.collider = Some(shape);
        self
    }

    /// Adds a sprite.
    pub fn with_sprite(mut self, sprite: SpriteId) -> Self {
        self.sprite = Some(sprite);
        self
    }

    /// Adds a light, optionally with a glow sprite.
    pub fn with_light(mut self, light: LightSource, light_sprite: bool) -> Self {
        self.light = Some(light);
        self.light_sprite = light_sprite;
        self
    }

    /// Adds a trigger area.
    pub fn with_trigger(mut self, area: TriggerArea) -> Self {
        self.trigger = Some(area);
        self
    }
}

impl Collidable for ColliderShape {
    fn collider(&self) -> &ColliderShape {
        self
    }
}

impl Drawable for SpriteId {
    fn sprite(&self) -> SpriteId {
        *self
    }
}

impl Triggerable for TriggerArea {
    fn trigger_area(&self) -> TriggerArea {
        *self
    }
}

impl Lightable for Archetype {
    fn light(&self) -> LightSource {
        self.light.unwrap_or(LightSource {
            radius: 0.0,
            color: [0, 0, 0],
            on_below: f32::NEG_INFINITY,
        })
    }

    fn has_light_sprite(&self) -> bool {
        self.light_sprite
    }
}

impl EntityKind for Archetype {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_collidable(&self) -> Option<&dyn Collidable> {
        self.collider.as_ref().map(|c| c as &dyn Collidable)
    }

    fn as_drawable(&self) -> Option<&dyn Drawable> {
        self.sprite.as_ref().map(|s| s as &dyn Drawable)
    }

    fn as_lightable(&self) -> Option<&dyn Lightable> {
        self.light.is_some().then_some(self as &dyn Lightable)
    }

    fn as_triggerable(&self) -> Option<&dyn Triggerable> {
        self.trigger.as_ref().map(|t| t as &dyn Triggerable)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
