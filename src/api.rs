use glam::{IVec2, Vec2};

use crate::body::Body;
use crate::error::PhysicsError;
use crate::types::*;

/// Per-body collision callbacks, implemented by each kind of game object
/// (player, projectile, platform, ...). Every method has a default, so a
/// handler only overrides what it cares about.
pub trait CollisionHandler {
    /// Called when `this` overlaps `other` during contact resolution. Return
    /// false to let the bodies pass through each other for this tick; the
    /// overlap has still been observed.
    fn on_collide_with_object(&mut self, this: &Body, other_id: BodyId, other: &Body) -> bool {
        let _ = (this, other_id, other);
        true
    }

    /// Whether a tile with `code` at `cell` blocks this body's movement.
    fn on_collide_with_tile(&self, code: i32, cell: IVec2) -> bool {
        let _ = cell;
        code > 0
    }

    /// Whether a tile with `code` at `cell` stops a raycast cast on behalf of this body.
    fn on_collide_with_tile_raycast(&self, code: i32, cell: IVec2) -> bool {
        let _ = cell;
        code > 0
    }
}

/// Public API contract for the fixed-step physics world.
pub trait PhysicsWorldApi {
    /// Construct a new world with the given configuration.
    fn new(cfg: PhysicsConfig) -> Self
    where
        Self: Sized;

    // --- Body lifecycle ----------------------------------------------------

    /// Insert a body and return its handle. Bodies update in spawn order.
    fn spawn(&mut self, body: Body) -> BodyId;

    /// Insert a body together with its collision callbacks.
    fn spawn_with_handler(&mut self, body: Body, handler: Box<dyn CollisionHandler>) -> BodyId;

    /// Mark a body destroyed, detach it from its parent and destroy its children.
    fn destroy(&mut self, id: BodyId) -> Result<(), PhysicsError>;

    /// Destroy every non-persistent top-level body and compact the registry.
    fn destroy_all(&mut self);

    /// Change collision flags. Collidable membership updates before the next tick.
    fn set_collision(
        &mut self,
        id: BodyId,
        collide_solids: bool,
        is_solid: bool,
        collide_tiles: bool,
    ) -> Result<(), PhysicsError>;

    // --- Attachment --------------------------------------------------------

    /// Attach `child` to `parent` at the given local offset.
    fn attach(
        &mut self,
        parent: BodyId,
        child: BodyId,
        local_pos: Vec2,
        local_angle: f32,
    ) -> Result<(), PhysicsError>;

    /// Detach `child` from `parent`; the child keeps its last world transform.
    fn detach(&mut self, parent: BodyId, child: BodyId) -> Result<(), PhysicsError>;

    // --- Simulation --------------------------------------------------------

    /// Advance every body by one fixed tick.
    fn step(&mut self);

    // --- Queries -----------------------------------------------------------

    fn body(&self, id: BodyId) -> Option<&Body>;

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body>;

    /// First blocking tile between `start` and `end`, tested with `viewer`'s
    /// raycast predicate (or "code > 0" without a viewer). Returns the cell center.
    fn raycast_tiles(&self, start: Vec2, end: Vec2, viewer: Option<BodyId>) -> Option<Vec2>;

    /// Whether a box at `pos` would overlap tiles that block `body`.
    fn tile_collision_test(&self, pos: Vec2, size: Vec2, body: Option<BodyId>) -> bool;

    /// Bodies whose boxes the segment `start..end` intersects, in registry order.
    fn raycast_bodies(&self, start: Vec2, end: Vec2, scope: QueryScope) -> Vec<BodyId>;

    /// Visit bodies whose center lies strictly within `radius` of `pos`.
    fn for_each_in_radius<F>(&self, pos: Vec2, radius: f32, scope: QueryScope, f: F)
    where
        F: FnMut(BodyId, &Body);

    /// Visit bodies whose box overlaps the box centered at `pos` with full `size`.
    fn for_each_in_box<F>(&self, pos: Vec2, size: Vec2, scope: QueryScope, f: F)
    where
        F: FnMut(BodyId, &Body);

    /// Visit bodies whose box contains `point`, edges included.
    fn for_each_at_point<F>(&self, point: Vec2, scope: QueryScope, f: F)
    where
        F: FnMut(BodyId, &Body);

    /// Visit every live body in registry order.
    fn for_each_body<F>(&self, scope: QueryScope, f: F)
    where
        F: FnMut(BodyId, &Body);
}

/// Primitive intersection tests and contact math used by the solver.
pub trait NarrowphaseApi {
    /// Strict overlap of two centered boxes given their full sizes.
    fn overlap_box_box(c0: Vec2, s0: Vec2, c1: Vec2, s1: Vec2) -> bool;

    /// Whether `p` lies inside (or on the edge of) the centered box.
    fn overlap_point_box(p: Vec2, c: Vec2, s: Vec2) -> bool;

    /// Whether the segment `a..b` touches the centered box.
    fn segment_intersects_box(a: Vec2, b: Vec2, c: Vec2, s: Vec2) -> bool;

    /// Post-collision velocities of two masses along one axis, blended from
    /// the fully elastic result (`elasticity = 1`) to the fully inelastic one.
    fn blend_velocities(m0: f32, v0: f32, m1: f32, v1: f32, elasticity: f32) -> (f32, f32);
}
