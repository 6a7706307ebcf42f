//! Pairwise sprite collision detection with once-per-contact reporting.

use std::collections::HashSet;

use super::sprite::{Sprite, SpriteId};

/// Half side length assumed when a sprite has no usable width/height.
pub const DEFAULT_HALF_EXTENT: i32 = 24;

/// After a collision fires, no *new* pair may fire for this long. Separation
/// tracking keeps running during the window so a pair can re-trigger after
/// splitting apart.
pub const COLLISION_COOLDOWN_MS: f64 = 200.0;

/// Axis-aligned bounding-box overlap, boxes centered at (x, y).
/// Symmetric: `overlaps(a, b) == overlaps(b, a)`.
pub fn overlaps(a: &Sprite, b: &Sprite) -> bool {
    let (l1, r1, t1, b1) = bounds(a);
    let (l2, r2, t2, b2) = bounds(b);
    !(r1 < l2 || l1 > r2 || b1 < t2 || t1 > b2)
}

fn bounds(s: &Sprite) -> (i32, i32, i32, i32) {
    let hx = if s.width > 0 {
        (s.width / 2) as i32
    } else {
        DEFAULT_HALF_EXTENT
    };
    let hy = if s.height > 0 {
        (s.height / 2) as i32
    } else {
        DEFAULT_HALF_EXTENT
    };
    (s.x - hx, s.x + hx, s.y - hy, s.y + hy)
}

/// Tracks which sprite pairs currently overlap so each contact is reported
/// exactly once, plus the shared post-fire cooldown window.
pub struct CollisionTracker {
    active: HashSet<(SpriteId, SpriteId)>,
    cooldown_until: f64,
}

impl CollisionTracker {
    pub fn new() -> Self {
        Self {
            active: HashSet::new(),
            cooldown_until: 0.0,
        }
    }

    /// Scans all unordered sprite pairs at timestamp `now` and returns the
    /// pairs that newly entered overlap. A continuing overlap is never
    /// re-reported; a pair leaving overlap is forgotten unconditionally (even
    /// during cooldown) so separation is recognized promptly.
    pub fn scan(&mut self, sprites: &[Sprite], now: f64) -> Vec<(SpriteId, SpriteId)> {
        let mut fired = Vec::new();
        for (i, a) in sprites.iter().enumerate() {
            for b in &sprites[i + 1..] {
                let key = canonical(a.id, b.id);
                if overlaps(a, b) {
                    if now >= self.cooldown_until && !self.active.contains(&key) {
                        self.active.insert(key);
                        self.cooldown_until = now + COLLISION_COOLDOWN_MS;
                        fired.push(key);
                    }
                } else {
                    self.active.remove(&key);
                }
            }
        }
        fired
    }

    /// Forgets all contacts and lifts the cooldown (run reset).
    pub fn clear(&mut self) {
        self.active.clear();
        self.cooldown_until = 0.0;
    }
}

impl Default for CollisionTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn canonical(a: SpriteId, b: SpriteId) -> (SpriteId, SpriteId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite_at(id: SpriteId, x: i32, y: i32) -> Sprite {
        Sprite {
            id,
            x,
            y,
            rotation: 0,
            width: 48,
            height: 48,
        }
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = sprite_at(1, 0, 0);
        let b = sprite_at(2, 30, 10);
        assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        let far = sprite_at(3, 200, 0);
        assert_eq!(overlaps(&a, &far), overlaps(&far, &a));
        assert!(!overlaps(&a, &far));
    }

    #[test]
    fn zero_size_sprite_uses_default_half_extent() {
        let mut a = sprite_at(1, 0, 0);
        a.width = 0;
        a.height = 0;
        let b = sprite_at(2, 40, 0);
        // 24 + 24 half-extents meet at distance 48.
        assert!(overlaps(&a, &b));
    }

    #[test]
    fn continuing_overlap_fires_once() {
        let mut tracker = CollisionTracker::new();
        let sprites = [sprite_at(1, 0, 0), sprite_at(2, 10, 0)];
        assert_eq!(tracker.scan(&sprites, 0.0), vec![(1, 2)]);
        // Still overlapping on the next tick, inside the cooldown window.
        assert!(tracker.scan(&sprites, 16.0).is_empty());
        // And after the cooldown, the same continuous contact stays silent.
        assert!(tracker.scan(&sprites, 500.0).is_empty());
    }

    #[test]
    fn separation_allows_retrigger_after_cooldown() {
        let mut tracker = CollisionTracker::new();
        let together = [sprite_at(1, 0, 0), sprite_at(2, 10, 0)];
        let apart = [sprite_at(1, 0, 0), sprite_at(2, 400, 0)];
        assert_eq!(tracker.scan(&together, 0.0).len(), 1);
        // Separation is tracked even during the cooldown window.
        assert!(tracker.scan(&apart, 50.0).is_empty());
        // Re-entering overlap after the cooldown fires again.
        assert_eq!(tracker.scan(&together, 300.0), vec![(1, 2)]);
    }

    #[test]
    fn cooldown_suppresses_other_new_pairs() {
        let mut tracker = CollisionTracker::new();
        let sprites = [
            sprite_at(1, 0, 0),
            sprite_at(2, 10, 0),
            sprite_at(3, 400, 0),
        ];
        assert_eq!(tracker.scan(&sprites, 0.0), vec![(1, 2)]);
        // A third sprite wandering into sprite 1 during the window is held off.
        let moved = [
            sprite_at(1, 0, 0),
            sprite_at(2, 10, 0),
            sprite_at(3, 20, 0),
        ];
        assert!(tracker.scan(&moved, 100.0).is_empty());
        // After the window lifts, the new contact reports.
        let fired = tracker.scan(&moved, 300.0);
        assert!(fired.contains(&(1, 3)));
    }
}
