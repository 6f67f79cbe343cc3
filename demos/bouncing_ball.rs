use glam::Vec2;
use tilebody::*;

fn main() {
    let mut world = PhysicsWorld::new(PhysicsConfig::with_gravity(-0.01));

    let floor = world.spawn(Body::fixed(Vec2::ZERO, Vec2::new(100.0, 1.0)));
    let ball = world.spawn(
        Body::new(Vec2::new(0.0, 10.0), Vec2::ONE)
            .with_elasticity(0.8)
            .with_collision(true, true, false),
    );
    println!("Inserted floor={:?} ball={:?}", floor, ball);

    for _ in 0..600 {
        world.step();
        let b = world.body(ball).unwrap();
        if b.ground().is_some() {
            println!(
                "tick {:>3}: landed at y={:.3}, bounce vy={:.4}",
                world.tick(),
                b.position.y,
                b.velocity.y
            );
        }
    }
}
