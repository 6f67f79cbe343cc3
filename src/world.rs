use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use std::f32::consts::TAU;
use std::time::Instant;

use crate::api::{CollisionHandler, NarrowphaseApi, PhysicsWorldApi};
use crate::body::Body;
use crate::error::{ConfigError, PhysicsError};
use crate::narrowphase::Narrowphase;
use crate::registry::CollisionRegistry;
use crate::tiles::TileCollisionGrid;
use crate::types::*;

/// Fixed-step world: owns the bodies, the tile grid and the solver state.
pub struct PhysicsWorld {
    pub cfg: PhysicsConfig,
    registry: CollisionRegistry,
    tiles: TileCollisionGrid,
    rng: ChaCha8Rng,
    tick: u64,
    last_stats: StepStats,
}

/// `sign` that treats zero as positive, so a centered contact still picks a side.
fn side(v: f32) -> f32 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

impl PhysicsWorldApi for PhysicsWorld {
    fn new(cfg: PhysicsConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        Self {
            cfg,
            registry: CollisionRegistry::new(),
            tiles: TileCollisionGrid::default(),
            rng,
            tick: 0,
            last_stats: StepStats::default(),
        }
    }

    fn spawn(&mut self, mut body: Body) -> BodyId {
        debug_assert!(body.collide_solids || !body.is_solid, "solid bodies must collide with solids");
        // Links from a cloned body refer to another body's relations.
        body.parent = None;
        body.children.clear();
        body.ground = None;
        body.destroyed = false;
        self.registry.insert(body, None)
    }

    fn spawn_with_handler(&mut self, mut body: Body, handler: Box<dyn CollisionHandler>) -> BodyId {
        debug_assert!(body.collide_solids || !body.is_solid, "solid bodies must collide with solids");
        body.parent = None;
        body.children.clear();
        body.ground = None;
        body.destroyed = false;
        self.registry.insert(body, Some(handler))
    }

    fn destroy(&mut self, id: BodyId) -> Result<(), PhysicsError> {
        let Some(body) = self.registry.get(id) else {
            log::warn!("destroy: unknown body {id:?}");
            return Err(PhysicsError::UnknownBody(id));
        };
        if body.destroyed {
            log::warn!("destroy: body {id:?} destroyed twice");
            return Err(PhysicsError::AlreadyDestroyed(id));
        }
        self.destroy_tree(id);
        log::debug!("destroyed body {id:?}");
        Ok(())
    }

    fn destroy_all(&mut self) {
        let targets: Vec<BodyId> = self
            .registry
            .iter_scope(QueryScope::All)
            .filter(|(_, b)| !b.persistent && b.parent.is_none())
            .map(|(id, _)| id)
            .collect();
        for id in targets {
            self.destroy_tree(id);
        }
        let removed = self.registry.compact();
        log::debug!("destroy_all removed {removed} bodies, {} remain", self.registry.len());
    }

    fn set_collision(
        &mut self,
        id: BodyId,
        collide_solids: bool,
        is_solid: bool,
        collide_tiles: bool,
    ) -> Result<(), PhysicsError> {
        if is_solid && !collide_solids {
            log::warn!("set_collision: body {id:?} is solid but not collidable");
            return Err(PhysicsError::SolidNotCollidable(id));
        }
        let body = self
            .registry
            .bodies
            .get_mut(id)
            .filter(|b| !b.destroyed)
            .ok_or(PhysicsError::UnknownBody(id))?;
        let changed = body.collide_solids != collide_solids;
        body.collide_solids = collide_solids;
        body.is_solid = is_solid;
        body.collide_tiles = collide_tiles;
        if changed {
            self.registry.mark_dirty(id);
        }
        Ok(())
    }

    fn attach(
        &mut self,
        parent: BodyId,
        child: BodyId,
        local_pos: Vec2,
        local_angle: f32,
    ) -> Result<(), PhysicsError> {
        if parent == child {
            log::warn!("attach: body {child:?} attached to itself");
            return Err(PhysicsError::SelfAttach(child));
        }
        self.registry.live(parent).ok_or(PhysicsError::UnknownBody(parent))?;
        let child_body = self.registry.live(child).ok_or(PhysicsError::UnknownBody(child))?;
        if let Some(current) = child_body.parent {
            log::warn!("attach: body {child:?} already attached to {current:?}");
            return Err(PhysicsError::AlreadyAttached { child, parent: current });
        }

        // Walk up from the new parent; meeting the child means a cycle.
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                log::warn!("attach: {child:?} is an ancestor of {parent:?}");
                return Err(PhysicsError::AttachCycle { child, parent });
            }
            cursor = self.registry.get(id).and_then(|b| b.parent);
        }

        if let Some(c) = self.registry.get_mut(child) {
            c.parent = Some(parent);
            c.local_pos = local_pos;
            c.local_angle = local_angle;
            c.ground = None;
        }
        if let Some(p) = self.registry.get_mut(parent) {
            debug_assert!(!p.children.contains(&child));
            p.children.push(child);
        }
        Ok(())
    }

    fn detach(&mut self, parent: BodyId, child: BodyId) -> Result<(), PhysicsError> {
        let child_body = self.registry.get_mut(child).ok_or(PhysicsError::UnknownBody(child))?;
        if child_body.parent != Some(parent) {
            log::warn!("detach: body {child:?} is not attached to {parent:?}");
            return Err(PhysicsError::NotAttached { child, parent });
        }
        child_body.parent = None;
        if let Some(p) = self.registry.get_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        Ok(())
    }

    fn step(&mut self) {
        let t_all = if self.cfg.enable_timing { Some(Instant::now()) } else { None };
        self.tick += 1;
        let mut stats = StepStats { tick: self.tick, ..Default::default() };

        self.registry.flush_pending();

        // Top-level bodies in insertion order; each one's attached subtree follows it.
        let order = self.registry.order.clone();
        for id in order {
            if self.registry.live(id).is_some_and(|b| b.parent.is_none()) {
                self.update_tree(id, &mut stats);
            }
        }

        stats.bodies_removed = self.registry.compact();
        if let Some(t_all) = t_all {
            stats.step_ms = t_all.elapsed().as_secs_f64() * 1000.0;
        }
        log::trace!(
            "tick {}: integrated={} attached={} pairs={} solid={} stuck={} tiles={} removed={}",
            stats.tick,
            stats.bodies_integrated,
            stats.bodies_attached,
            stats.pairs_tested,
            stats.solid_contacts,
            stats.stuck_separations,
            stats.tile_contacts,
            stats.bodies_removed
        );
        self.last_stats = stats;
    }

    fn body(&self, id: BodyId) -> Option<&Body> {
        self.registry.get(id)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.registry.get_mut(id)
    }

    fn raycast_tiles(&self, start: Vec2, end: Vec2, viewer: Option<BodyId>) -> Option<Vec2> {
        self.registry.tile_raycast(&self.tiles, viewer, start, end)
    }

    fn tile_collision_test(&self, pos: Vec2, size: Vec2, body: Option<BodyId>) -> bool {
        self.registry.tile_test(&self.tiles, body, pos, size)
    }

    fn raycast_bodies(&self, start: Vec2, end: Vec2, scope: QueryScope) -> Vec<BodyId> {
        self.registry
            .iter_scope(scope)
            .filter(|(_, b)| Narrowphase::segment_intersects_box(start, end, b.position, b.size))
            .map(|(id, _)| id)
            .collect()
    }

    fn for_each_in_radius<F>(&self, pos: Vec2, radius: f32, scope: QueryScope, mut f: F)
    where
        F: FnMut(BodyId, &Body),
    {
        for (id, b) in self.registry.iter_scope(scope) {
            if b.position.distance(pos) < radius {
                f(id, b);
            }
        }
    }

    fn for_each_in_box<F>(&self, pos: Vec2, size: Vec2, scope: QueryScope, mut f: F)
    where
        F: FnMut(BodyId, &Body),
    {
        for (id, b) in self.registry.iter_scope(scope) {
            if Narrowphase::overlap_box_box(pos, size, b.position, b.size) {
                f(id, b);
            }
        }
    }

    fn for_each_at_point<F>(&self, point: Vec2, scope: QueryScope, mut f: F)
    where
        F: FnMut(BodyId, &Body),
    {
        for (id, b) in self.registry.iter_scope(scope) {
            if Narrowphase::overlap_point_box(point, b.position, b.size) {
                f(id, b);
            }
        }
    }

    fn for_each_body<F>(&self, scope: QueryScope, mut f: F)
    where
        F: FnMut(BodyId, &Body),
    {
        for (id, b) in self.registry.iter_scope(scope) {
            f(id, b);
        }
    }
}

impl PhysicsWorld {
    /// Like [`PhysicsWorldApi::new`] but rejects unusable configurations.
    pub fn try_new(cfg: PhysicsConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(<Self as PhysicsWorldApi>::new(cfg))
    }

    pub fn tiles(&self) -> &TileCollisionGrid {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileCollisionGrid {
        &mut self.tiles
    }

    pub fn registry(&self) -> &CollisionRegistry {
        &self.registry
    }

    /// Apply buffered collidable membership changes now instead of at the next tick.
    pub fn flush_pending(&mut self) {
        self.registry.flush_pending();
    }

    pub fn body_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Counters and timing for the last completed `step`.
    pub fn stats(&self) -> StepStats {
        self.last_stats
    }

    fn timer(&self) -> Option<Instant> {
        if self.cfg.enable_timing { Some(Instant::now()) } else { None }
    }

    fn destroy_tree(&mut self, id: BodyId) {
        let Some(body) = self.registry.get_mut(id) else { return };
        if body.destroyed {
            return;
        }
        body.destroyed = true;
        let parent = body.parent.take();
        let children = std::mem::take(&mut body.children);

        if let Some(p) = parent.and_then(|p| self.registry.get_mut(p)) {
            p.children.retain(|&c| c != id);
        }
        for child in children {
            if let Some(c) = self.registry.get_mut(child) {
                c.parent = None;
            }
            self.destroy_tree(child);
        }
    }

    fn update_tree(&mut self, id: BodyId, stats: &mut StepStats) {
        self.update_body(id, stats);
        let children = match self.registry.live(id) {
            Some(b) if !b.children.is_empty() => b.children.clone(),
            _ => return,
        };
        for child in children {
            self.update_tree(child, stats);
        }
    }

    fn update_body(&mut self, id: BodyId, stats: &mut StepStats) {
        let Some(body) = self.registry.live(id) else { return };

        if let Some(parent) = body.parent {
            let (local_pos, local_angle) = (body.local_pos, body.local_angle);
            let Some((position, angle)) = self
                .registry
                .live(parent)
                .map(|p| p.child_transform(local_pos, local_angle))
            else {
                return;
            };
            if let Some(body) = self.registry.get_mut(id) {
                body.position = position;
                body.angle = angle;
            }
            stats.bodies_attached += 1;
            return;
        }

        let t0 = self.timer();
        let Some(body) = self.registry.bodies.get_mut(id) else { return };
        let old_position = body.integrate(&self.cfg);
        stats.bodies_integrated += 1;
        if let Some(t0) = t0 {
            stats.integrate_ms += t0.elapsed().as_secs_f64() * 1000.0;
        }

        if !self.cfg.enable_solver || body.mass == 0.0 {
            return;
        }

        let moving_down = body.velocity.y < 0.0;
        let collide_solids = body.collide_solids;
        let collide_tiles = body.collide_tiles;

        if let Some(ground) = body.ground.take() {
            let ground_speed = match ground {
                GroundContact::Tile => 0.0,
                GroundContact::Body(g) => self.registry.live(g).map_or(0.0, |b| b.velocity.x),
            };
            if let Some(body) = self.registry.get_mut(id) {
                body.velocity.x = ground_speed + (body.velocity.x - ground_speed) * body.friction;
            }
        }

        if collide_solids {
            let t1 = self.timer();
            self.resolve_solids(id, old_position, moving_down, stats);
            if let Some(t1) = t1 {
                stats.solids_ms += t1.elapsed().as_secs_f64() * 1000.0;
            }
        }
        if collide_tiles {
            let t2 = self.timer();
            self.resolve_tiles(id, old_position, moving_down, stats);
            if let Some(t2) = t2 {
                stats.tiles_ms += t2.elapsed().as_secs_f64() * 1000.0;
            }
        }
    }

    /// Push body `a` out of every solid it overlaps, in collidable order.
    fn resolve_solids(&mut self, a: BodyId, old: Vec2, moving_down: bool, stats: &mut StepStats) {
        let gravity = self.cfg.gravity;
        let epsilon = self.cfg.contact_epsilon;

        for i in 0..self.registry.collidable.len() {
            let b = self.registry.collidable[i];
            if b == a {
                continue;
            }
            let Some(body_a) = self.registry.get(a) else { return };
            let Some(body_b) = self.registry.live(b) else { continue };
            // Non-solid bodies never push each other.
            if body_b.parent.is_some() || (!body_a.is_solid && !body_b.is_solid) {
                continue;
            }
            stats.pairs_tested += 1;
            if !Narrowphase::overlap_box_box(body_a.position, body_a.size, body_b.position, body_b.size) {
                continue;
            }
            if !self.registry.notify_collision(a, b) {
                continue;
            }

            let (Some(body_a), Some(body_b)) = (self.registry.get(a), self.registry.get(b)) else {
                continue;
            };
            let mut pos_a = body_a.position;
            let mut vel_a = body_a.velocity;
            let mut ground_a = body_a.ground;
            let (size_a, mass_a, elasticity_a) = (body_a.size, body_a.mass, body_a.elasticity);
            let mut vel_b = body_b.velocity;
            let (pos_b, size_b, mass_b) = (body_b.position, body_b.size, body_b.mass);
            let b_grounded = body_b.ground.is_some();
            let elasticity = elasticity_a.max(body_b.elasticity);

            if Narrowphase::overlap_box_box(old, size_a, pos_b, size_b) {
                // Started the tick inside each other: nudge apart instead of teleporting.
                let delta = old - pos_b;
                let length = delta.length();
                let accel = self.cfg.push_apart_accel;
                let push = if length < self.cfg.push_apart_min_distance {
                    Vec2::from_angle(self.rng.random_range(0.0..TAU)) * accel
                } else {
                    delta * (accel / length)
                };
                if let Some(body) = self.registry.get_mut(a) {
                    body.velocity += push;
                }
                if mass_b != 0.0 {
                    if let Some(body) = self.registry.get_mut(b) {
                        body.velocity -= push;
                    }
                }
                stats.stuck_separations += 1;
                log::trace!("bodies {a:?} and {b:?} overlapping, separating");
                continue;
            }

            let size_both = size_a + size_b;
            let small_step_up = (old.y - pos_b.y) * 2.0 > size_both.y + gravity;
            let overlapped_x_before = (old.x - pos_b.x).abs() * 2.0 < size_both.x;
            let overlapped_y_before = (old.y - pos_b.y).abs() * 2.0 < size_both.y;

            if small_step_up || overlapped_x_before || !overlapped_y_before {
                pos_a.y = pos_b.y + side(old.y - pos_b.y) * (size_both.y * 0.5 + epsilon);
                if mass_b == 0.0 || (b_grounded && moving_down) {
                    if moving_down {
                        ground_a = Some(GroundContact::Body(b));
                    }
                    vel_a.y *= -elasticity_a;
                } else {
                    let (va, vb) = Narrowphase::blend_velocities(mass_a, vel_a.y, mass_b, vel_b.y, elasticity);
                    vel_a.y = va;
                    vel_b.y = vb;
                }
            }
            // A diagonal approach (neither axis overlapped before) resolves both.
            if !small_step_up && (overlapped_y_before || !overlapped_x_before) {
                pos_a.x = pos_b.x + side(old.x - pos_b.x) * (size_both.x * 0.5 + epsilon);
                if mass_b != 0.0 {
                    let (va, vb) = Narrowphase::blend_velocities(mass_a, vel_a.x, mass_b, vel_b.x, elasticity);
                    vel_a.x = va;
                    vel_b.x = vb;
                } else {
                    vel_a.x *= -elasticity_a;
                }
            }

            if let Some(body) = self.registry.get_mut(a) {
                body.position = pos_a;
                body.velocity = vel_a;
                body.ground = ground_a;
            }
            if mass_b != 0.0 {
                if let Some(body) = self.registry.get_mut(b) {
                    body.velocity = vel_b;
                }
            }
            stats.solid_contacts += 1;
        }
    }

    /// Move body `a` back out of the tile grid along whichever axes are blocked.
    fn resolve_tiles(&mut self, a: BodyId, old: Vec2, moving_down: bool, stats: &mut StepStats) {
        let Some(body) = self.registry.get(a) else { return };
        let (pos, size) = (body.position, body.size);
        let test = |p: Vec2| self.registry.tile_test(&self.tiles, Some(a), p, size);

        if !test(pos) {
            return;
        }
        if test(old) {
            // Already embedded before moving; leave it alone.
            log::trace!("body {a:?} started the tick inside tiles");
            return;
        }
        let blocked_y = test(Vec2::new(old.x, pos.y));
        let blocked_x = test(Vec2::new(pos.x, old.y));

        let gravity = self.cfg.gravity;
        let Some(body) = self.registry.get_mut(a) else { return };
        if blocked_y || !blocked_x {
            body.velocity.y *= -body.elasticity;
            if moving_down {
                body.ground = Some(GroundContact::Tile);
            }
            // Ease the next tick's fall so the body settles flush on the tile top.
            let bottom = old.y - body.size.y * 0.5;
            let gap = bottom.trunc() - bottom;
            let pull = gravity * body.gravity_scale;
            if gap < 0.0 && gap > body.damping * body.velocity.y + pull {
                body.velocity.y = if body.damping != 0.0 { (gap - pull) / body.damping } else { 0.0 };
            }
            body.position.y = old.y;
        }
        if blocked_x {
            body.position.x = old.x;
            body.velocity.x *= -body.elasticity;
        }
        stats.tile_contacts += 1;
    }
}
