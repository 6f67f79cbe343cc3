use glam::{DVec2, IVec2, Vec2};

/// Dense row-major grid of tile collision codes.
///
/// `0` is empty. Any other value is an opaque code that each body's predicate
/// interprets. Reads outside the grid return `0` and writes outside are dropped,
/// so bodies near the level edge never need special casing.
#[derive(Clone, Debug, Default)]
pub struct TileCollisionGrid {
    size: IVec2,
    cells: Vec<i32>,
}

impl TileCollisionGrid {
    /// Allocate an empty grid of `size.x * size.y` cells.
    pub fn new(size: IVec2) -> Self {
        let mut grid = Self::default();
        grid.init(size);
        grid
    }

    /// Reallocate to `size`, clearing every cell. Negative dimensions clamp to zero.
    pub fn init(&mut self, size: IVec2) {
        let size = size.max(IVec2::ZERO);
        self.size = size;
        self.cells.clear();
        self.cells.resize((size.x as usize) * (size.y as usize), 0);
        log::debug!("tile grid initialized to {}x{}", size.x, size.y);
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    /// Reset every cell to empty without changing the size.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    pub fn is_in_bounds(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.size.x && cell.y < self.size.y
    }

    fn index(&self, cell: IVec2) -> Option<usize> {
        self.is_in_bounds(cell)
            .then(|| (cell.y as usize) * (self.size.x as usize) + cell.x as usize)
    }

    pub fn get(&self, cell: IVec2) -> i32 {
        self.index(cell).map_or(0, |i| self.cells[i])
    }

    pub fn set(&mut self, cell: IVec2, code: i32) {
        if let Some(i) = self.index(cell) {
            self.cells[i] = code;
        }
    }

    /// True if any nonzero cell under the box centered at `center` with full
    /// size `extents` satisfies `predicate(code, cell)`.
    ///
    /// The covered range is `floor(min)..max` per axis (upper bound exclusive),
    /// clamped to the grid.
    pub fn region_test<F>(&self, center: Vec2, extents: Vec2, mut predicate: F) -> bool
    where
        F: FnMut(i32, IVec2) -> bool,
    {
        let half = extents * 0.5;
        let min_x = ((center.x - half.x).floor() as i32).max(0);
        let min_y = ((center.y - half.y).floor() as i32).max(0);
        let max_x = (center.x + half.x).min(self.size.x as f32);
        let max_y = (center.y + half.y).min(self.size.y as f32);

        let mut y = min_y;
        while (y as f32) < max_y {
            let mut x = min_x;
            while (x as f32) < max_x {
                let cell = IVec2::new(x, y);
                let code = self.get(cell);
                if code != 0 && predicate(code, cell) {
                    return true;
                }
                x += 1;
            }
            y += 1;
        }
        false
    }

    /// `region_test` with the default "positive codes are solid" predicate.
    pub fn region_test_default(&self, center: Vec2, extents: Vec2) -> bool {
        self.region_test(center, extents, |code, _| code > 0)
    }

    /// Walk the cells between `start` and `end` with Bresenham's line stepper and
    /// return the center of the first nonzero cell accepted by `predicate`.
    ///
    /// The segment is clipped to the grid first, so far-away endpoints cost
    /// nothing and a segment that never enters the grid returns `None`.
    /// The stepper is 8-connected, so a diagonal ray may pass between two
    /// blocking cells that only touch at a corner.
    pub fn raycast<F>(&self, start: Vec2, end: Vec2, mut predicate: F) -> Option<Vec2>
    where
        F: FnMut(i32, IVec2) -> bool,
    {
        let bounds = self.size.as_dvec2();
        let (start, end) = clip_to_rect(start.as_dvec2(), end.as_dvec2(), bounds)?;
        // Rounding can land a hair outside the rect; keep the walk bounded.
        let start = start.clamp(DVec2::ZERO, bounds).floor().as_ivec2();
        let end = end.clamp(DVec2::ZERO, bounds).floor().as_ivec2();
        let delta = end - start;
        let dx = delta.x.abs();
        let dy = -delta.y.abs();
        let sx = if delta.x < 0 { -1 } else { 1 };
        let sy = if delta.y < 0 { -1 } else { 1 };
        let mut e = dx + dy;

        let mut cell = start;
        loop {
            let code = self.get(cell);
            if code != 0 && predicate(code, cell) {
                return Some(cell.as_vec2() + Vec2::splat(0.5));
            }
            if cell == end {
                return None;
            }
            let e2 = 2 * e;
            if e2 >= dy {
                e += dy;
                cell.x += sx;
            }
            if e2 <= dx {
                e += dx;
                cell.y += sy;
            }
        }
    }

    /// `raycast` with the default "positive codes block" predicate.
    pub fn raycast_default(&self, start: Vec2, end: Vec2) -> Option<Vec2> {
        self.raycast(start, end, |code, _| code > 0)
    }
}

/// Slab-clip `a..b` to the rectangle `[0, max]`. Runs in f64 so endpoints far
/// outside the grid still clip to the right cell.
fn clip_to_rect(a: DVec2, b: DVec2, max: DVec2) -> Option<(DVec2, DVec2)> {
    let d = b - a;
    let mut tmin = 0.0f64;
    let mut tmax = 1.0f64;
    for (o, dir, hi) in [(a.x, d.x, max.x), (a.y, d.y, max.y)] {
        if dir == 0.0 {
            if o < 0.0 || o > hi {
                return None;
            }
            continue;
        }
        let mut t1 = -o / dir;
        let mut t2 = (hi - o) / dir;
        if t1 > t2 {
            core::mem::swap(&mut t1, &mut t2);
        }
        tmin = tmin.max(t1);
        tmax = tmax.min(t2);
        if tmin > tmax {
            return None;
        }
    }
    let at = |t: f64| if t >= 1.0 { b } else { a + d * t };
    Some((at(tmin), at(tmax)))
}
