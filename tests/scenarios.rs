use std::cell::Cell;
use std::rc::Rc;

use glam::{IVec2, Vec2};
use tilebody::*;

fn ball(pos: Vec2) -> Body {
    Body::new(pos, Vec2::ONE).with_elasticity(1.0).with_collision(true, true, false)
}

#[test]
fn ball_lands_on_floor_and_bounces() {
    let mut world = PhysicsWorld::new(PhysicsConfig::with_gravity(-0.01));
    let floor = world.spawn(Body::fixed(Vec2::ZERO, Vec2::new(100.0, 1.0)));
    let id = world.spawn(ball(Vec2::new(0.0, 10.0)));

    let mut landed = None;
    for tick in 0..1000 {
        let vy_before = world.body(id).unwrap().velocity.y;
        world.step();
        let b = world.body(id).unwrap();
        if b.ground() == Some(GroundContact::Body(floor)) {
            assert!(vy_before < 0.0);
            assert!(b.velocity.y > 0.0, "velocity.y = {}", b.velocity.y);
            assert!(b.position.y > 1.0);
            landed = Some(tick);
            break;
        }
    }
    assert!(landed.is_some(), "ball never landed");

    world.step();
    assert_eq!(world.body(id).unwrap().ground(), None);
    assert!(world.body(id).unwrap().velocity.y > 0.0);
    assert_eq!(world.body(floor).unwrap().position, Vec2::ZERO);
}

#[test]
fn resting_stack_stays_above_floor() {
    let mut world = PhysicsWorld::new(PhysicsConfig::with_gravity(-0.02));
    world.spawn(Body::fixed(Vec2::ZERO, Vec2::new(20.0, 1.0)));
    let boxes: Vec<_> = (0..3)
        .map(|i| world.spawn(Body::new(Vec2::new(0.0, 1.5 + 1.5 * i as f32), Vec2::ONE).with_collision(true, true, false)))
        .collect();
    for _ in 0..600 {
        world.step();
    }
    for (i, &id) in boxes.iter().enumerate() {
        let b = world.body(id).unwrap();
        assert!(b.position.is_finite());
        assert!(b.position.y > 0.9 + i as f32 * 0.9, "box {i} sank to {}", b.position.y);
        assert!(b.velocity.y.abs() <= world.cfg.max_speed);
    }
}

struct OneWay {
    hits: Rc<Cell<usize>>,
}

impl CollisionHandler for OneWay {
    fn on_collide_with_object(&mut self, this: &Body, _: BodyId, other: &Body) -> bool {
        self.hits.set(self.hits.get() + 1);
        // Only block things coming from above.
        other.position.y > this.position.y
    }
}

#[test]
fn handler_can_veto_resolution() {
    let mut world = PhysicsWorld::new(PhysicsConfig::with_gravity(0.0));
    let hits = Rc::new(Cell::new(0));
    let platform = world.spawn_with_handler(
        Body::fixed(Vec2::new(0.0, 5.0), Vec2::new(6.0, 0.5)),
        Box::new(OneWay { hits: hits.clone() }),
    );
    let rising = world.spawn(ball(Vec2::new(0.0, 3.0)).with_velocity(Vec2::new(0.0, 0.25)));

    for _ in 0..20 {
        world.step();
    }
    let b = world.body(rising).unwrap();
    assert!(b.position.y > 7.0, "passed through from below, y = {}", b.position.y);
    assert!(b.velocity.y > 0.0);
    assert!(hits.get() > 0);
    assert_eq!(world.body(platform).unwrap().position, Vec2::new(0.0, 5.0));
}

struct SeeThrough;

impl CollisionHandler for SeeThrough {
    fn on_collide_with_tile_raycast(&self, code: i32, _: IVec2) -> bool {
        code == 1
    }
}

#[test]
fn raycast_uses_viewer_predicate() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());
    world.tiles_mut().init(IVec2::new(32, 8));
    world.tiles_mut().set(IVec2::new(4, 2), 2);
    world.tiles_mut().set(IVec2::new(9, 2), 1);
    let viewer = world.spawn_with_handler(Body::new(Vec2::new(0.5, 2.5), Vec2::ONE), Box::new(SeeThrough));

    let start = Vec2::new(0.5, 2.5);
    let end = Vec2::new(20.5, 2.5);
    assert_eq!(world.raycast_tiles(start, end, None), Some(Vec2::new(4.5, 2.5)));
    assert_eq!(world.raycast_tiles(start, end, Some(viewer)), Some(Vec2::new(9.5, 2.5)));
    assert!(world.tile_collision_test(Vec2::new(4.5, 2.5), Vec2::ONE, Some(viewer)));
    assert_eq!(world.raycast_tiles(Vec2::new(0.5, 5.5), Vec2::new(20.5, 5.5), None), None);
}

#[test]
fn bodies_near_grid_edges_are_safe() {
    let mut world = PhysicsWorld::new(PhysicsConfig::with_gravity(-0.05));
    world.tiles_mut().init(IVec2::new(4, 4));
    world.tiles_mut().set(IVec2::new(0, 0), 1);
    let ids: Vec<_> = [Vec2::new(-50.0, 2.0), Vec2::new(2.0, 90.0), Vec2::new(1e6, -1e6)]
        .into_iter()
        .map(|p| world.spawn(Body::new(p, Vec2::ONE).with_collision(false, false, true)))
        .collect();
    for _ in 0..100 {
        world.step();
    }
    for id in ids {
        assert!(world.body(id).unwrap().position.is_finite());
    }
}

#[test]
fn destroyed_ground_is_not_followed() {
    let mut world = PhysicsWorld::new(PhysicsConfig::with_gravity(-0.05));
    let mut platform = Body::fixed(Vec2::ZERO, Vec2::new(10.0, 1.0));
    platform.velocity = Vec2::new(0.2, 0.0);
    let platform = world.spawn(platform);
    let rider = world.spawn(Body::new(Vec2::new(0.0, 1.2), Vec2::ONE).with_friction(0.0).with_collision(true, true, false));
    for _ in 0..3 {
        world.step();
    }
    assert_eq!(world.body(rider).unwrap().ground(), Some(GroundContact::Body(platform)));
    world.destroy(platform).unwrap();
    world.step();
    // Ground speed falls back to zero once the platform is gone.
    assert_eq!(world.body(rider).unwrap().velocity.x, 0.0);
    assert!(world.body(platform).is_none());
}

#[test]
fn same_seed_same_outcome() {
    let run = |seed: u64| {
        let cfg = PhysicsConfig { seed, ..PhysicsConfig::with_gravity(-0.01) };
        let mut world = PhysicsWorld::new(cfg);
        world.spawn(Body::fixed(Vec2::ZERO, Vec2::new(10.0, 1.0)));
        let ids: Vec<_> = (0..4).map(|_| world.spawn(ball(Vec2::new(0.0, 2.0)))).collect();
        for _ in 0..50 {
            world.step();
        }
        ids.iter().map(|&id| world.body(id).unwrap().position).collect::<Vec<_>>()
    };
    assert_eq!(run(3), run(3));
}
