use glam::Vec2;

use crate::types::{BodyId, GroundContact, PhysicsConfig};

/// Physical state of one simulated entity.
///
/// Bodies collide as axis-aligned boxes of full size `size` centered on
/// `position`; `angle` is carried for rendering and attachment only.
///
/// Collision flags, ground contact and parent/child links are owned by the
/// world so its registry stays consistent; read them through the accessors.
#[derive(Clone, Debug)]
pub struct Body {
    pub position: Vec2,
    /// Units per tick.
    pub velocity: Vec2,
    /// Radians, counter-clockwise.
    pub angle: f32,
    pub angle_velocity: f32,
    pub size: Vec2,
    /// Zero marks a fixed body: no gravity, never resolved against others.
    pub mass: f32,
    pub damping: f32,
    pub angle_damping: f32,
    pub elasticity: f32,
    pub friction: f32,
    pub gravity_scale: f32,
    /// Mirror children horizontally when propagating attachment transforms.
    pub mirror: bool,
    /// Survives `destroy_all`.
    pub persistent: bool,

    pub(crate) collide_solids: bool,
    pub(crate) is_solid: bool,
    pub(crate) collide_tiles: bool,
    pub(crate) ground: Option<GroundContact>,
    pub(crate) parent: Option<BodyId>,
    pub(crate) children: Vec<BodyId>,
    pub(crate) local_pos: Vec2,
    pub(crate) local_angle: f32,
    pub(crate) destroyed: bool,
}

impl Body {
    /// A dynamic unit-mass body with no damping and no collision flags.
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self::from_config(position, size, &PhysicsConfig::default())
    }

    /// A body using the per-body defaults of `cfg`.
    pub fn from_config(position: Vec2, size: Vec2, cfg: &PhysicsConfig) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angle_velocity: 0.0,
            size,
            mass: cfg.default_mass,
            damping: cfg.default_damping,
            angle_damping: cfg.default_angle_damping,
            elasticity: cfg.default_elasticity,
            friction: cfg.default_friction,
            gravity_scale: 1.0,
            mirror: false,
            persistent: false,
            collide_solids: false,
            is_solid: false,
            collide_tiles: false,
            ground: None,
            parent: None,
            children: Vec::new(),
            local_pos: Vec2::ZERO,
            local_angle: 0.0,
            destroyed: false,
        }
    }

    /// A fixed (zero mass) solid box, e.g. a floor or moving platform.
    pub fn fixed(position: Vec2, size: Vec2) -> Self {
        Self::new(position, size).with_mass(0.0).with_collision(true, true, false)
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_elasticity(mut self, elasticity: f32) -> Self {
        self.elasticity = elasticity;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    /// Set the collision flags before the body is spawned.
    /// A solid body must also collide with solids.
    pub fn with_collision(mut self, collide_solids: bool, is_solid: bool, collide_tiles: bool) -> Self {
        self.collide_solids = collide_solids;
        self.is_solid = is_solid;
        self.collide_tiles = collide_tiles;
        self
    }

    pub fn collides_with_solids(&self) -> bool {
        self.collide_solids
    }

    pub fn is_solid(&self) -> bool {
        self.is_solid
    }

    pub fn collides_with_tiles(&self) -> bool {
        self.collide_tiles
    }

    /// What this body landed on last tick; cleared after friction is applied.
    pub fn ground(&self) -> Option<GroundContact> {
        self.ground
    }

    pub fn is_on_ground(&self) -> bool {
        self.ground.is_some()
    }

    pub fn parent(&self) -> Option<BodyId> {
        self.parent
    }

    pub fn children(&self) -> &[BodyId] {
        &self.children
    }

    pub fn local_pos(&self) -> Vec2 {
        self.local_pos
    }

    pub fn local_angle(&self) -> f32 {
        self.local_angle
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_fixed(&self) -> bool {
        self.mass == 0.0
    }

    pub fn mirror_sign(&self) -> f32 {
        if self.mirror { -1.0 } else { 1.0 }
    }

    pub fn apply_acceleration(&mut self, acceleration: Vec2) {
        if self.mass != 0.0 {
            self.velocity += acceleration;
        }
    }

    pub fn apply_force(&mut self, force: Vec2) {
        if self.mass != 0.0 {
            self.velocity += force / self.mass;
        }
    }

    /// Transform a point from this body's local frame into world space.
    pub fn local_to_world(&self, local: Vec2) -> Vec2 {
        self.position + Vec2::from_angle(self.angle).rotate(local)
    }

    /// Inverse of [`Body::local_to_world`].
    pub fn world_to_local(&self, world: Vec2) -> Vec2 {
        Vec2::from_angle(-self.angle).rotate(world - self.position)
    }

    /// World transform of a child attached with `local_pos`/`local_angle`.
    pub(crate) fn child_transform(&self, local_pos: Vec2, local_angle: f32) -> (Vec2, f32) {
        let sign = self.mirror_sign();
        let offset = Vec2::from_angle(self.angle).rotate(local_pos * Vec2::new(sign, 1.0));
        (self.position + offset, sign * local_angle + self.angle)
    }

    /// Advance velocity, position and angle by one tick. Returns the position
    /// the body held before moving.
    pub(crate) fn integrate(&mut self, cfg: &PhysicsConfig) -> Vec2 {
        debug_assert!((0.0..=1.0).contains(&self.damping), "damping out of range");
        debug_assert!((0.0..=1.0).contains(&self.angle_damping), "angle damping out of range");

        let max = cfg.max_speed;
        self.velocity = self.velocity.clamp(Vec2::splat(-max), Vec2::splat(max));

        let old_position = self.position;
        self.velocity *= self.damping;
        if self.mass != 0.0 {
            self.velocity.y += cfg.gravity * self.gravity_scale;
        }
        self.position += self.velocity;

        self.angle_velocity *= self.angle_damping;
        self.angle += self.angle_velocity;
        old_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_integrate_clamps_speed() {
        let cfg = PhysicsConfig { max_speed: 0.5, ..Default::default() };
        let mut b = Body::new(Vec2::ZERO, Vec2::ONE).with_velocity(Vec2::new(40.0, -9.0));
        b.integrate(&cfg);
        assert_eq!(b.velocity, Vec2::new(0.5, -0.5));
        assert_eq!(b.position, Vec2::new(0.5, -0.5));
    }

    #[test]
    fn test_integrate_damping_never_speeds_up() {
        let cfg = PhysicsConfig::default();
        let mut b = Body::new(Vec2::ZERO, Vec2::ONE).with_velocity(Vec2::new(0.3, -0.2)).with_damping(0.9);
        b.angle_velocity = 0.1;
        b.angle_damping = 0.5;
        let mut prev = b.velocity.length();
        for _ in 0..20 {
            b.integrate(&cfg);
            let now = b.velocity.length();
            assert!(now < prev);
            prev = now;
        }
        assert!(b.angle_velocity.abs() < 0.1);
    }

    #[test]
    fn test_integrate_gravity_only_with_mass() {
        let cfg = PhysicsConfig::with_gravity(-0.01);
        let mut dynamic = Body::new(Vec2::ZERO, Vec2::ONE).with_gravity_scale(2.0);
        let old = dynamic.integrate(&cfg);
        assert_eq!(old, Vec2::ZERO);
        assert!((dynamic.velocity.y + 0.02).abs() < 1e-7);

        let mut fixed = Body::new(Vec2::ZERO, Vec2::ONE).with_mass(0.0);
        fixed.integrate(&cfg);
        assert_eq!(fixed.velocity, Vec2::ZERO);
        assert_eq!(fixed.position, Vec2::ZERO);
    }

    #[test]
    fn test_child_transform_rotates_by_parent_angle() {
        let mut parent = Body::new(Vec2::ZERO, Vec2::ONE);
        parent.angle = FRAC_PI_2;
        let (pos, angle) = parent.child_transform(Vec2::new(1.0, 0.0), 0.0);
        assert!((pos - Vec2::new(0.0, 1.0)).length() < 1e-6);
        assert!((angle - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_child_transform_mirrored() {
        let mut parent = Body::new(Vec2::new(3.0, 1.0), Vec2::ONE);
        parent.mirror = true;
        let (pos, angle) = parent.child_transform(Vec2::new(2.0, 0.5), 0.25);
        assert!((pos - Vec2::new(1.0, 1.5)).length() < 1e-6);
        assert!((angle + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_local_world_round_trip() {
        let mut b = Body::new(Vec2::new(2.0, -1.0), Vec2::ONE);
        b.angle = 0.7;
        let p = Vec2::new(0.3, 4.0);
        assert!((b.world_to_local(b.local_to_world(p)) - p).length() < 1e-5);
    }

    #[test]
    fn test_forces_ignore_fixed_bodies() {
        let mut b = Body::new(Vec2::ZERO, Vec2::ONE).with_mass(2.0);
        b.apply_force(Vec2::new(1.0, 0.0));
        b.apply_acceleration(Vec2::new(0.0, 0.5));
        assert_eq!(b.velocity, Vec2::new(0.5, 0.5));

        let mut f = Body::new(Vec2::ZERO, Vec2::ONE).with_mass(0.0);
        f.apply_force(Vec2::ONE);
        f.apply_acceleration(Vec2::ONE);
        assert_eq!(f.velocity, Vec2::ZERO);
    }
}
