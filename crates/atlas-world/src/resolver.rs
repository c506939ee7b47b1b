//! Continuous movement resolution against per-pixel obstruction masks.
//!
//! A move is walked pixel by pixel along the line from the start to the target
//! position, so fast movers cannot tunnel through thin walls. When a diagonal
//! walk runs into an obstacle it tries to sidestep by one or two pixels along
//! the other axis before giving up, which lets movers slide past corners and
//! small bumps.
//!
//! The walk:
//! 1. Movers without collision, and zero displacements, translate directly.
//! 2. A mover whose current pixel is already blocked is stuck; it is allowed
//!    to move to any destination inside the map.
//! 3. Otherwise, a DDA walk compares `y = a·x + b` with the next cell edge to
//!    choose a horizontal, vertical, or diagonal (taper) step.
//! 4. A blocked axis step tries deflections of ±1 then ±2 pixels along the
//!    other axis; axis-only movement never deflects.
//! 5. The walk is capped at a fixed number of steps.
//! 6. The final position is the (shifted) target clamped into the last
//!    visited pixel.

use glam::Vec2;
use tracing::warn;

use crate::layout::GridLayout;
use crate::region::{MASK_FLIGHT, MASK_GROUND};
use crate::settings::ResolverConfig;
use crate::shape::PixelRect;

/// Tolerance when comparing the walk line against cell edges.
const EDGE_EPSILON: f64 = 1e-6;

/// Keeps the clamped final position strictly inside its pixel.
const PIXEL_MARGIN: f64 = 1e-3;

/// Upper bound on single-ulp corrections after narrowing to `f32`.
const MAX_ROUNDING_NUDGES: u32 = 16;

/// Source of per-pixel obstruction masks.
pub trait ObstructionMap {
    /// Mask bits at world pixel `(px, py)`. Pixels outside the map, or in
    /// regions that are not loaded, must report every bit set.
    fn mask_at(&self, px: i32, py: i32) -> u8;

    /// The whole-map pixel rectangle.
    fn pixel_bounds(&self) -> PixelRect;
}

/// Which mask bit obstructs the mover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveMode {
    /// Walking movers, blocked by the ground bit.
    Ground,
    /// Flying movers, blocked by the flight bit.
    Flight,
}

impl MoveMode {
    /// The mask bit tested for this mode.
    pub fn mask(self) -> u8 {
        match self {
            MoveMode::Ground => MASK_GROUND,
            MoveMode::Flight => MASK_FLIGHT,
        }
    }
}

/// One move to resolve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveRequest {
    /// Start position in tile units.
    pub from: Vec2,
    /// Desired displacement in tile units, speed factors already applied.
    pub displacement: Vec2,
    /// Obstruction mode.
    pub mode: MoveMode,
    /// Whether the mover is checked against the map at all.
    pub collide: bool,
}

/// Result of a resolved move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveOutcome {
    /// Final position in tile units.
    pub position: Vec2,
    /// The walk stopped before reaching its target.
    pub blocked: bool,
    /// Number of accepted deflections.
    pub deflections: u32,
    /// The walk hit the step cap.
    pub truncated: bool,
    /// Steps taken, including the failed last one.
    pub steps: u32,
}

impl MoveOutcome {
    fn reached(position: Vec2) -> Self {
        Self {
            position,
            blocked: false,
            deflections: 0,
            truncated: false,
            steps: 0,
        }
    }
}

/// Resolves moves for one pixel scale and step cap.
#[derive(Clone, Copy, Debug)]
pub struct Resolver {
    scale: Vec2,
    max_steps: u32,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    X,
    Y,
    Taper,
}

impl Resolver {
    /// Creates a resolver with `scale` pixels per tile.
    pub fn new(scale: Vec2, max_steps: u32) -> Self {
        Self { scale, max_steps }
    }

    /// Creates a resolver matching the layout's tile size.
    pub fn from_layout(layout: &GridLayout, config: ResolverConfig) -> Self {
        Self::new(layout.pixel_scale(), config.max_steps)
    }

    /// The step cap.
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Resolves one move against `map`.
    pub fn resolve<M: ObstructionMap + ?Sized>(&self, map: &M, request: MoveRequest) -> MoveOutcome {
        let MoveRequest {
            from,
            displacement,
            mode,
            collide,
        } = request;

        if !displacement.is_finite() {
            warn!("Ignoring non-finite displacement {:?}", displacement);
            return MoveOutcome::reached(from);
        }
        let target = from + displacement;
        if !collide || displacement == Vec2::ZERO {
            return MoveOutcome::reached(target);
        }

        let mask = mode.mask();
        let blocked = |x: i32, y: i32| map.mask_at(x, y) & mask != 0;

        let p0 = from * self.scale;
        let p1 = target * self.scale;
        let c0 = (p0.x.floor() as i32, p0.y.floor() as i32);
        let c1 = (p1.x.floor() as i32, p1.y.floor() as i32);

        if blocked(c0.0, c0.1) && map.pixel_bounds().contains(c1.0, c1.1) {
            return MoveOutcome::reached(target);
        }
        if c0 == c1 {
            return MoveOutcome::reached(target);
        }

        let walk = Walk {
            p0: (p0.x as f64, p0.y as f64),
            p1: (p1.x as f64, p1.y as f64),
            c0,
            c1,
            max_steps: self.max_steps,
        };
        let result = walk.run(&blocked);

        if result.truncated && cfg!(debug_assertions) {
            warn!(
                "Movement walk from {:?} to {:?} truncated after {} steps",
                from, target, result.steps
            );
        }

        let x = pixel_to_tile(walk.p1.0 + result.shift.0 as f64, result.cell.0, self.scale.x);
        let y = pixel_to_tile(walk.p1.1 + result.shift.1 as f64, result.cell.1, self.scale.y);
        MoveOutcome {
            position: Vec2::new(x, y),
            blocked: result.blocked,
            deflections: result.deflections,
            truncated: result.truncated,
            steps: result.steps,
        }
    }
}

/// Clamps a pixel coordinate into `cell` and converts it to tile units.
///
/// The result satisfies `floor(tile * scale) == cell` in `f32`, the same
/// arithmetic every pixel lookup uses. Far from the origin the `f32` spacing
/// exceeds the margin, so the narrowed value is nudged back into the cell.
fn pixel_to_tile(value: f64, cell: i32, scale: f32) -> f32 {
    let clamped = value.clamp(cell as f64, cell as f64 + 1.0 - PIXEL_MARGIN);
    let mut tile = (clamped / scale as f64) as f32;
    for _ in 0..MAX_ROUNDING_NUDGES {
        let pixel = (tile * scale).floor() as i64;
        if pixel > cell as i64 {
            tile = tile.next_down();
        } else if pixel < cell as i64 {
            tile = tile.next_up();
        } else {
            break;
        }
    }
    tile
}

/// Pixel-space state of one walk.
struct Walk {
    p0: (f64, f64),
    p1: (f64, f64),
    c0: (i32, i32),
    c1: (i32, i32),
    max_steps: u32,
}

struct WalkResult {
    cell: (i32, i32),
    shift: (i32, i32),
    blocked: bool,
    deflections: u32,
    truncated: bool,
    steps: u32,
}

impl Walk {
    fn run(&self, blocked: &impl Fn(i32, i32) -> bool) -> WalkResult {
        let sx = (self.c1.0 - self.c0.0).signum();
        let sy = (self.c1.1 - self.c0.1).signum();
        let diagonal = sx != 0 && sy != 0;

        // Line through the start point; only used for diagonal walks, where
        // the x extent is at least one pixel.
        let a = if diagonal {
            (self.p1.1 - self.p0.1) / (self.p1.0 - self.p0.0)
        } else {
            0.0
        };
        let mut b = self.p0.1 - a * self.p0.0;

        let mut out = WalkResult {
            cell: self.c0,
            shift: (0, 0),
            blocked: false,
            deflections: 0,
            truncated: false,
            steps: 0,
        };
        let mut target = self.c1;

        while out.cell != target {
            if out.steps >= self.max_steps {
                out.truncated = true;
                break;
            }
            out.steps += 1;

            let (cx, cy) = out.cell;
            let step = if cx == target.0 {
                Step::Y
            } else if cy == target.1 {
                Step::X
            } else {
                let edge_x = (if sx > 0 { cx + 1 } else { cx }) as f64;
                let edge_y = (if sy > 0 { cy + 1 } else { cy }) as f64;
                let line_y = a * edge_x + b;
                // Positive when the line reaches the vertical edge before the row edge.
                let ahead = (edge_y - line_y) * sy as f64;
                if ahead > EDGE_EPSILON {
                    Step::X
                } else if ahead < -EDGE_EPSILON {
                    Step::Y
                } else {
                    Step::Taper
                }
            };

            match step {
                Step::X => {
                    if !blocked(cx + sx, cy) {
                        out.cell = (cx + sx, cy);
                    } else if let Some(k) = diagonal
                        .then(|| deflect(blocked, (cx, cy), (sx, 0), sy))
                        .flatten()
                    {
                        out.cell = (cx + sx, cy + k);
                        target.1 += k;
                        out.shift.1 += k;
                        b += k as f64;
                        out.deflections += 1;
                    } else {
                        out.blocked = true;
                        break;
                    }
                }
                Step::Y => {
                    if !blocked(cx, cy + sy) {
                        out.cell = (cx, cy + sy);
                    } else if let Some(k) = diagonal
                        .then(|| deflect(blocked, (cx, cy), (0, sy), sx))
                        .flatten()
                    {
                        out.cell = (cx + k, cy + sy);
                        target.0 += k;
                        out.shift.0 += k;
                        b -= a * k as f64;
                        out.deflections += 1;
                    } else {
                        out.blocked = true;
                        break;
                    }
                }
                Step::Taper => {
                    let x_open = !blocked(cx + sx, cy);
                    let y_open = !blocked(cx, cy + sy);
                    if (x_open || y_open) && !blocked(cx + sx, cy + sy) {
                        out.cell = (cx + sx, cy + sy);
                    } else if x_open {
                        out.cell = (cx + sx, cy);
                    } else if y_open {
                        out.cell = (cx, cy + sy);
                    } else {
                        out.blocked = true;
                        break;
                    }
                }
            }
        }
        out
    }
}

/// Finds a sidestep for a blocked axis step.
///
/// `dir` is the blocked unit step; the sidestep runs along the other axis, in
/// the walk's direction (`side`) first. Every pixel crossed while sidestepping
/// and the shifted destination must be open. Returns the accepted offset.
fn deflect(
    blocked: &impl Fn(i32, i32) -> bool,
    (cx, cy): (i32, i32),
    (dx, dy): (i32, i32),
    side: i32,
) -> Option<i32> {
    // Unit vector along the sidestep axis.
    let (ux, uy) = (dy.abs(), dx.abs());
    [side, -side, 2 * side, -2 * side].into_iter().find(|&k| {
        let s = k.signum();
        let path_open = (1..=k.abs()).all(|j| !blocked(cx + ux * s * j, cy + uy * s * j));
        path_open && !blocked(cx + dx + ux * k, cy + dy + uy * k)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
