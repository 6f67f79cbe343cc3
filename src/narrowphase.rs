use glam::Vec2;

use crate::api::NarrowphaseApi;

/// Box and velocity primitives used by the solver and queries.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn overlap_box_box(c0: Vec2, s0: Vec2, c1: Vec2, s1: Vec2) -> bool {
        // Touching edges do not count as overlap.
        let d = (c0 - c1).abs() * 2.0;
        let s = s0 + s1;
        d.x < s.x && d.y < s.y
    }

    fn overlap_point_box(p: Vec2, c: Vec2, s: Vec2) -> bool {
        let h = s * 0.5;
        let min = c - h;
        let max = c + h;
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }

    fn segment_intersects_box(a: Vec2, b: Vec2, c: Vec2, s: Vec2) -> bool {
        // Slab method clamped to the segment's [0,1] parameter range
        let h = s * 0.5;
        let aabb_min = c - h;
        let aabb_max = c + h;
        let d = b - a;
        let mut tmin = 0.0f32;
        let mut tmax = 1.0f32;

        for (o, dir, lo, hi) in [
            (a.x, d.x, aabb_min.x, aabb_max.x),
            (a.y, d.y, aabb_min.y, aabb_max.y),
        ] {
            if dir.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
            }
            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return false;
            }
        }
        true
    }

    fn blend_velocities(m0: f32, v0: f32, m1: f32, v1: f32, elasticity: f32) -> (f32, f32) {
        let total = m0 + m1;
        debug_assert!(total != 0.0, "blend requires at least one body with mass");
        let inelastic = (m0 * v0 + m1 * v1) / total;
        let elastic0 = (v0 * (m0 - m1) + 2.0 * m1 * v1) / total;
        let elastic1 = (v1 * (m1 - m0) + 2.0 * m0 * v0) / total;
        (
            inelastic + (elastic0 - inelastic) * elasticity,
            inelastic + (elastic1 - inelastic) * elasticity,
        )
    }
}
