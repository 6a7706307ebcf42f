// Integration tests (native) for the `blockcat` crate.
// These tests avoid wasm-specific functionality and exercise pure Rust logic so
// they can run under `cargo test` on the host.

use blockcat::stage::collision::CollisionTracker;
use blockcat::stage::scheduler::{Scheduler, StageEvent};
use blockcat::stage::script::{Block, BlockKind, ScriptStore};
use blockcat::stage::sprite::{DEFAULT_SPRITE_SIZE, Sprite, SpriteStore};

#[test]
fn fresh_stage_has_one_active_default_sprite() {
    let sprites = SpriteStore::new();
    assert_eq!(sprites.list().len(), 1);
    let s = sprites.list()[0];
    assert_eq!((s.x, s.y, s.rotation), (0, 0, 0));
    assert_eq!(
        (s.width, s.height),
        (DEFAULT_SPRITE_SIZE, DEFAULT_SPRITE_SIZE)
    );
    assert_eq!(sprites.active(), s.id);
    assert_eq!(sprites.hero(), None);
}

#[test]
fn added_sprites_get_fresh_ids_and_become_active() {
    let mut sprites = SpriteStore::new();
    let a = sprites.add_sprite();
    let b = sprites.add_sprite();
    assert_ne!(a, b);
    assert_eq!(sprites.active(), b);
    assert_eq!(sprites.list().len(), 3);
}

#[test]
fn unknown_ids_are_ignored_everywhere() {
    let mut sprites = SpriteStore::new();
    sprites.update(99, |s| Sprite { x: 1000, ..s });
    sprites.set_active(99);
    sprites.set_hero(99);
    assert_eq!(sprites.active(), 1);
    assert_eq!(sprites.hero(), None);
    assert!(sprites.get(99).is_none());
}

#[test]
fn hero_and_active_are_independent() {
    let mut sprites = SpriteStore::new();
    let b = sprites.add_sprite();
    sprites.set_active(1);
    sprites.set_hero(b);
    assert_eq!(sprites.active(), 1);
    assert_eq!(sprites.hero(), Some(b));
}

#[test]
fn update_replaces_only_the_matching_sprite() {
    let mut sprites = SpriteStore::new();
    let b = sprites.add_sprite();
    sprites.update(1, |s| Sprite { x: 77, ..s });
    assert_eq!(sprites.get(1).unwrap().x, 77);
    assert_eq!(sprites.get(b).unwrap().x, 0);
    // Identity is immutable even if the mutator tries to change it.
    sprites.update(1, |s| Sprite { id: 5, ..s });
    assert!(sprites.get(1).is_some());
    assert!(sprites.get(5).is_none());
}

/// Full pipeline: one sprite walks into another, the collision fires once and
/// the "tag" response (script swap) hands the rest of the program to the
/// sprite that was hit.
#[test]
fn collision_tag_swaps_behavior_mid_run() {
    let mut sprites = SpriteStore::new();
    let mut scripts = ScriptStore::new();
    scripts.register(1);
    let other = sprites.add_sprite();
    scripts.register(other);
    sprites.update(other, |s| Sprite { x: 200, ..s });
    sprites.set_active(1);

    scripts.append(1, Block::new(1, BlockKind::Move { steps: 100 }));
    scripts.append(1, Block::new(1, BlockKind::Move { steps: 100 }));

    let mut sched = Scheduler::new();
    let mut tracker = CollisionTracker::new();
    sched.start(0.0, &sprites, &scripts);

    let mut collisions = 0;
    let mut finished = false;
    let mut t = 0.0;
    for _ in 0..200 {
        let events = sched.tick(t, &mut sprites, &scripts);
        if events.contains(&StageEvent::RunFinished) {
            finished = true;
            break;
        }
        for (a, b) in tracker.scan(sprites.list(), t) {
            collisions += 1;
            scripts.swap(a, b);
        }
        t += 50.0;
    }

    assert!(finished);
    assert_eq!(collisions, 1);
    // Sprite 1 stopped where it tagged; the tagged sprite ran the remainder.
    assert_eq!(sprites.get(1).unwrap().x, 200);
    assert_eq!(sprites.get(other).unwrap().x, 400);
}
