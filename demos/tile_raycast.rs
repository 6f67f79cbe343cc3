use glam::{IVec2, Vec2};
use tilebody::*;

fn main() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());

    world.tiles_mut().init(IVec2::new(16, 16));
    world.tiles_mut().set(IVec2::new(5, 5), 1);
    world.tiles_mut().set(IVec2::new(8, 2), 1);

    let rays = [
        (Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)),
        (Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)),
        (Vec2::new(0.5, 2.5), Vec2::new(15.5, 2.5)),
    ];
    for (start, end) in rays {
        match world.raycast_tiles(start, end, None) {
            Some(hit) => println!("Ray {start} -> {end}: hit cell center ({:.1},{:.1})", hit.x, hit.y),
            None => println!("Ray {start} -> {end}: no hit"),
        }
    }
}
