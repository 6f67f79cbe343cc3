use glam::{IVec2, Vec2};
use slotmap::{SecondaryMap, SlotMap};

use crate::api::CollisionHandler;
use crate::body::Body;
use crate::tiles::TileCollisionGrid;
use crate::types::{BodyId, QueryScope};

/// Owner of every body in the world.
///
/// `order` is insertion order and drives update order; `collidable` mirrors the
/// bodies flagged to collide with solids. Membership changes are buffered in
/// `pending` and applied between ticks so the solver never iterates a list
/// that is being edited.
pub struct CollisionRegistry {
    pub(crate) bodies: SlotMap<BodyId, Body>,
    pub(crate) order: Vec<BodyId>,
    pub(crate) collidable: Vec<BodyId>,
    handlers: SecondaryMap<BodyId, Box<dyn CollisionHandler>>,
    pending: Vec<BodyId>,
}

impl CollisionRegistry {
    pub(crate) fn new() -> Self {
        Self {
            bodies: SlotMap::with_key(),
            order: Vec::new(),
            collidable: Vec::new(),
            handlers: SecondaryMap::new(),
            pending: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, body: Body, handler: Option<Box<dyn CollisionHandler>>) -> BodyId {
        let collidable = body.collide_solids;
        let id = self.bodies.insert(body);
        self.order.push(id);
        if let Some(h) = handler {
            self.handlers.insert(id, h);
        }
        if collidable {
            self.pending.push(id);
        }
        id
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id)
    }

    /// Live (not destroyed) body lookup.
    pub fn live(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id).filter(|b| !b.destroyed)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Bodies in insertion order, destroyed ones included until compaction.
    pub fn order(&self) -> &[BodyId] {
        &self.order
    }

    /// The collidable subset as of the last flush.
    pub fn collidable(&self) -> &[BodyId] {
        &self.collidable
    }

    /// Queue a membership re-check after a body's `collide_solids` flag changed.
    pub(crate) fn mark_dirty(&mut self, id: BodyId) {
        if !self.pending.contains(&id) {
            self.pending.push(id);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Apply buffered membership changes so `collidable` matches each body's flag.
    pub fn flush_pending(&mut self) {
        for id in std::mem::take(&mut self.pending) {
            let wants = self.live(id).is_some_and(|b| b.collide_solids);
            let pos = self.collidable.iter().position(|&c| c == id);
            match (wants, pos) {
                (true, None) => self.collidable.push(id),
                (false, Some(i)) => {
                    self.collidable.remove(i);
                }
                _ => {}
            }
        }
        debug_assert!(
            {
                let mut seen = self.collidable.clone();
                seen.sort();
                seen.windows(2).all(|w| w[0] != w[1])
            },
            "duplicate collidable membership"
        );
    }

    /// Drop destroyed bodies from every list and free their slots.
    /// Returns how many were removed.
    pub(crate) fn compact(&mut self) -> usize {
        let bodies = &self.bodies;
        let alive = |id: &BodyId| bodies.get(*id).is_some_and(|b| !b.destroyed);
        self.collidable.retain(alive);
        self.pending.retain(alive);

        let mut removed = 0;
        let order = std::mem::take(&mut self.order);
        for id in order {
            if self.bodies.get(id).is_some_and(|b| !b.destroyed) {
                self.order.push(id);
            } else {
                self.bodies.remove(id);
                self.handlers.remove(id);
                removed += 1;
            }
        }
        removed
    }

    /// Run both bodies' object callbacks. Both are always called; resolution
    /// proceeds only if neither objects.
    pub(crate) fn notify_collision(&mut self, a: BodyId, b: BodyId) -> bool {
        let (Some(body_a), Some(body_b)) = (self.bodies.get(a), self.bodies.get(b)) else {
            return false;
        };
        let resolve_a = match self.handlers.get_mut(a) {
            Some(h) => h.on_collide_with_object(body_a, b, body_b),
            None => true,
        };
        let resolve_b = match self.handlers.get_mut(b) {
            Some(h) => h.on_collide_with_object(body_b, a, body_a),
            None => true,
        };
        resolve_a && resolve_b
    }

    /// Tile region test with `id`'s movement predicate.
    pub(crate) fn tile_test(&self, tiles: &TileCollisionGrid, id: Option<BodyId>, pos: Vec2, size: Vec2) -> bool {
        match id.and_then(|id| self.handlers.get(id)) {
            Some(h) => tiles.region_test(pos, size, |code, cell| h.on_collide_with_tile(code, cell)),
            None => tiles.region_test_default(pos, size),
        }
    }

    /// Tile raycast with `id`'s raycast predicate.
    pub(crate) fn tile_raycast(&self, tiles: &TileCollisionGrid, id: Option<BodyId>, start: Vec2, end: Vec2) -> Option<Vec2> {
        match id.and_then(|id| self.handlers.get(id)) {
            Some(h) => tiles.raycast(start, end, |code, cell: IVec2| h.on_collide_with_tile_raycast(code, cell)),
            None => tiles.raycast_default(start, end),
        }
    }

    /// Live bodies in `scope`, in iteration order.
    pub fn iter_scope(&self, scope: QueryScope) -> impl Iterator<Item = (BodyId, &Body)> + '_ {
        let ids = match scope {
            QueryScope::All => &self.order,
            QueryScope::Collidable => &self.collidable,
        };
        ids.iter().filter_map(|&id| self.live(id).map(|b| (id, b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refuse;
    impl CollisionHandler for Refuse {
        fn on_collide_with_object(&mut self, _: &Body, _: BodyId, _: &Body) -> bool {
            false
        }
        fn on_collide_with_tile(&self, code: i32, _: IVec2) -> bool {
            code == 2
        }
    }

    fn collidable_body() -> Body {
        Body::new(Vec2::ZERO, Vec2::ONE).with_collision(true, true, false)
    }

    #[test]
    fn test_membership_is_buffered_until_flush() {
        let mut r = CollisionRegistry::new();
        let a = r.insert(collidable_body(), None);
        let b = r.insert(Body::new(Vec2::ZERO, Vec2::ONE), None);
        assert!(r.collidable().is_empty());
        r.flush_pending();
        assert_eq!(r.collidable(), &[a]);

        r.get_mut(b).unwrap().collide_solids = true;
        r.mark_dirty(b);
        r.get_mut(a).unwrap().collide_solids = false;
        r.mark_dirty(a);
        r.mark_dirty(a);
        assert_eq!(r.collidable(), &[a]);
        r.flush_pending();
        assert_eq!(r.collidable(), &[b]);
    }

    #[test]
    fn test_compact_removes_destroyed() {
        let mut r = CollisionRegistry::new();
        let a = r.insert(collidable_body(), None);
        let b = r.insert(collidable_body(), Some(Box::new(Refuse)));
        let c = r.insert(collidable_body(), None);
        r.flush_pending();
        r.get_mut(b).unwrap().destroyed = true;
        assert_eq!(r.compact(), 1);
        assert_eq!(r.order(), &[a, c]);
        assert_eq!(r.collidable(), &[a, c]);
        assert!(r.get(b).is_none());
        assert!(r.handlers.get(b).is_none());
    }

    #[test]
    fn test_notify_collision_calls_both() {
        let mut r = CollisionRegistry::new();
        let a = r.insert(collidable_body(), None);
        let b = r.insert(collidable_body(), Some(Box::new(Refuse)));
        let c = r.insert(collidable_body(), None);
        assert!(!r.notify_collision(a, b));
        assert!(!r.notify_collision(b, a));
        assert!(r.notify_collision(a, c));
    }

    #[test]
    fn test_tile_predicate_dispatch() {
        let mut tiles = TileCollisionGrid::new(IVec2::new(4, 4));
        tiles.set(IVec2::new(1, 1), 1);
        let mut r = CollisionRegistry::new();
        let plain = r.insert(Body::new(Vec2::ZERO, Vec2::ONE), None);
        let picky = r.insert(Body::new(Vec2::ZERO, Vec2::ONE), Some(Box::new(Refuse)));
        let at = Vec2::splat(1.5);
        assert!(r.tile_test(&tiles, Some(plain), at, Vec2::splat(0.5)));
        assert!(r.tile_test(&tiles, None, at, Vec2::splat(0.5)));
        assert!(!r.tile_test(&tiles, Some(picky), at, Vec2::splat(0.5)));
        // Raycast predicate keeps its default for the picky body.
        assert_eq!(r.tile_raycast(&tiles, Some(picky), Vec2::ZERO, Vec2::splat(3.0)), Some(at));
    }

    #[test]
    fn test_iter_scope_skips_destroyed() {
        let mut r = CollisionRegistry::new();
        let a = r.insert(collidable_body(), None);
        let b = r.insert(Body::new(Vec2::ZERO, Vec2::ONE), None);
        r.flush_pending();
        let all: Vec<_> = r.iter_scope(QueryScope::All).map(|(id, _)| id).collect();
        assert_eq!(all, vec![a, b]);
        r.get_mut(a).unwrap().destroyed = true;
        let all: Vec<_> = r.iter_scope(QueryScope::All).map(|(id, _)| id).collect();
        assert_eq!(all, vec![b]);
        assert_eq!(r.iter_scope(QueryScope::Collidable).count(), 0);
    }
}
