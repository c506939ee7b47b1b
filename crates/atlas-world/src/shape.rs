//! Pixel-space rectangles, entity collider shapes, and the mover footprint.
//!
//! Collider rectangles are expressed in pixels relative to the owning entity's
//! pixel position. The [`Footprint`] describes the generic mover's own shape as
//! a handful of per-row horizontal spans; inflating obstacles by it lets the
//! movement resolver test a single pixel per step.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel space. `w`/`h` are exclusive extents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub w: i32,
    /// Height in pixels.
    pub h: i32,
}

impl PixelRect {
    /// Creates a rectangle from its top-left corner and size.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// One past the right-most column.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// One past the bottom-most row.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    /// Returns `true` if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Returns the rectangle shifted by `(dx, dy)`, saturating at the `i32`
    /// range.
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.w,
            self.h,
        )
    }

    /// Returns `true` if both rectangles share at least one pixel.
    pub fn intersects(&self, other: &PixelRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// The overlapping part of two rectangles, if any.
    pub fn intersection(&self, other: &PixelRect) -> Option<PixelRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x0 < x1 && y0 < y1)
            .then(|| PixelRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0)))
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        PixelRect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// Whether pixel `(px, py)` lies inside.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }
}

/// One collider rectangle declared by an entity archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColliderRect {
    /// Left edge relative to the entity's pixel position.
    pub x: i32,
    /// Top edge relative to the entity's pixel position.
    pub y: i32,
    /// Width in pixels.
    pub w: i32,
    /// Height in pixels.
    pub h: i32,
    /// Blocks flying movers too.
    pub tall: bool,
    /// Rasterize verbatim instead of inflating by the mover footprint.
    pub exact: bool,
}

impl ColliderRect {
    /// A ground-only rectangle inflated by the mover footprint.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            tall: false,
            exact: false,
        }
    }

    /// Marks the rectangle as blocking flight.
    pub const fn tall(mut self) -> Self {
        self.tall = true;
        self
    }

    /// Marks the rectangle as rasterized verbatim.
    pub const fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// The rectangle as a [`PixelRect`].
    pub fn rect(&self) -> PixelRect {
        PixelRect::new(self.x, self.y, self.w, self.h)
    }

    /// Bitmap value painted for this rectangle.
    pub fn mask(&self) -> u8 {
        if self.tall {
            crate::region::MASK_ALL
        } else {
            crate::region::MASK_GROUND
        }
    }
}

/// Immutable collider metadata handed over by the entity factory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColliderShape {
    rects: Vec<ColliderRect>,
    bounds: PixelRect,
}

impl ColliderShape {
    /// Builds a shape and derives its aggregate bounds from the rectangles.
    pub fn new(rects: Vec<ColliderRect>) -> Self {
        let bounds = rects
            .iter()
            .fold(PixelRect::default(), |acc, r| acc.union(&r.rect()));
        Self { rects, bounds }
    }

    /// Builds a shape with factory-provided aggregate bounds.
    ///
    /// The bounds are widened if they fail to cover every rectangle.
    pub fn with_bounds(rects: Vec<ColliderRect>, bounds: PixelRect) -> Self {
        let covering = rects.iter().fold(bounds, |acc, r| acc.union(&r.rect()));
        if covering != bounds {
            tracing::warn!(
                "Collider bounds {:?} do not cover all rectangles; widened to {:?}",
                bounds,
                covering
            );
        }
        Self {
            rects,
            bounds: covering,
        }
    }

    /// The declared rectangles.
    pub fn rects(&self) -> &[ColliderRect] {
        &self.rects
    }

    /// Aggregate bounding rectangle (entity-relative).
    pub fn bounds(&self) -> PixelRect {
        self.bounds
    }
}

/// One row of the mover footprint: pixels `x0..=x1` at row offset `dy`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintSpan {
    /// Row offset from the mover's origin pixel.
    pub dy: i32,
    /// First covered column offset (inclusive).
    pub x0: i32,
    /// Last covered column offset (inclusive).
    pub x1: i32,
}

/// The generic mover's rounded-corner footprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    spans: Vec<FootprintSpan>,
}

impl Footprint {
    /// Builds a footprint from row spans. Spans with `x1 < x0` are dropped.
    pub fn new(spans: Vec<FootprintSpan>) -> Self {
        Self {
            spans: spans.into_iter().filter(|s| s.x1 >= s.x0).collect(),
        }
    }

    /// A single-pixel footprint (no inflation).
    pub fn point() -> Self {
        Self::new(vec![FootprintSpan { dy: 0, x0: 0, x1: 0 }])
    }

    /// The row spans.
    pub fn spans(&self) -> &[FootprintSpan] {
        &self.spans
    }

    /// Rectangles whose union is the set of mover origins that would overlap
    /// `obstacle` (Minkowski sum of the obstacle with the mirrored footprint).
    pub fn inflate_rects(&self, obstacle: PixelRect) -> impl Iterator<Item = PixelRect> + '_ {
        self.spans.iter().map(move |s| {
            PixelRect::new(
                obstacle.x.saturating_sub(s.x1),
                obstacle.y.saturating_sub(s.dy),
                obstacle.w.saturating_add(s.x1 - s.x0),
                obstacle.h,
            )
        })
    }

    /// Bounding rectangle of [`Footprint::inflate_rects`].
    pub fn inflate_bounds(&self, obstacle: PixelRect) -> PixelRect {
        self.inflate_rects(obstacle)
            .fold(obstacle, |acc, r| acc.union(&r))
    }
}

impl Default for Footprint {
    /// A 7×3 rounded footprint centered on the origin pixel.
    fn default() -> Self {
        Self::new(vec![
            FootprintSpan {
                dy: -1,
                x0: -2,
                x1: 2,
            },
            FootprintSpan {
                dy: 0,
                x0: -3,
                x1: 3,
            },
            FootprintSpan {
                dy: 1,
                x0: -2,
                x1: 2,
            },
        ])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
