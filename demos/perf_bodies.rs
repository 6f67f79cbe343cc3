use glam::{IVec2, Vec2};
use std::time::Instant;
use tilebody::*;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn main() {
    let mut world = PhysicsWorld::new(PhysicsConfig {
        enable_timing: true,
        ..PhysicsConfig::with_gravity(-0.01)
    });

    // 64x64 arena with a solid border
    let w = 64;
    world.tiles_mut().init(IVec2::new(w, w));
    for i in 0..w {
        for cell in [IVec2::new(i, 0), IVec2::new(i, w - 1), IVec2::new(0, i), IVec2::new(w - 1, i)] {
            world.tiles_mut().set(cell, 1);
        }
    }

    let n = 500usize; // number of bodies
    let mut seed = 1u32;
    for _ in 0..n {
        let rx = (lcg(&mut seed) as f32 / u32::MAX as f32) * 56.0 + 4.0;
        let ry = (lcg(&mut seed) as f32 / u32::MAX as f32) * 56.0 + 4.0;
        let vx = (lcg(&mut seed) as f32 / u32::MAX as f32) * 0.4 - 0.2;
        world.spawn(
            Body::new(Vec2::new(rx, ry), Vec2::splat(0.8))
                .with_velocity(Vec2::new(vx, 0.0))
                .with_elasticity(0.5)
                .with_collision(true, true, true),
        );
    }

    let ticks = 120;
    let t0 = Instant::now();
    let mut acc = StepStats::default();
    for _ in 0..ticks {
        world.step();
        let s = world.stats();
        acc.pairs_tested += s.pairs_tested;
        acc.solid_contacts += s.solid_contacts;
        acc.tile_contacts += s.tile_contacts;
        acc.integrate_ms += s.integrate_ms;
        acc.solids_ms += s.solids_ms;
        acc.tiles_ms += s.tiles_ms;
    }
    let secs = t0.elapsed().as_secs_f64();
    println!(
        "N={} ticks={} secs={:.3} ({:.3}ms/tick) integrate={:.3}ms solids={:.3}ms tiles={:.3}ms pairs={} solid={} tiles={}",
        n,
        ticks,
        secs,
        secs * 1000.0 / ticks as f64,
        acc.integrate_ms,
        acc.solids_ms,
        acc.tiles_ms,
        acc.pairs_tested,
        acc.solid_contacts,
        acc.tile_contacts
    );
}
