//! Sprite entities and the stage-wide sprite store.
//!
//! Sprites live in stage coordinates with the origin at the stage center
//! (positive y pointing down, matching canvas space). The store additionally
//! tracks two independent single-valued designations: the *active* sprite
//! (editing / speech-bubble target) and the optional *hero* sprite (collision
//! emphasis). They may point at the same sprite; neither constrains the other.

/// Stable sprite identity. Ids are assigned once and never reused.
pub type SpriteId = u32;

/// Default side length for a freshly added sprite, in stage pixels.
pub const DEFAULT_SPRITE_SIZE: u32 = 48;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sprite {
    pub id: SpriteId,
    pub x: i32,
    pub y: i32,
    /// Degrees, unbounded. Display wraps visually; the model does not.
    pub rotation: i32,
    pub width: u32,
    pub height: u32,
}

impl Sprite {
    fn new(id: SpriteId) -> Self {
        Self {
            id,
            x: 0,
            y: 0,
            rotation: 0,
            width: DEFAULT_SPRITE_SIZE,
            height: DEFAULT_SPRITE_SIZE,
        }
    }
}

/// Ordered collection of sprites plus the active / hero designations.
pub struct SpriteStore {
    sprites: Vec<Sprite>,
    next_id: SpriteId,
    active: SpriteId,
    hero: Option<SpriteId>,
}

impl SpriteStore {
    /// A fresh stage starts with one sprite at the origin, active, not hero.
    pub fn new() -> Self {
        Self {
            sprites: vec![Sprite::new(1)],
            next_id: 2,
            active: 1,
            hero: None,
        }
    }

    /// Adds a sprite with the default pose and makes it active. Returns its id.
    pub fn add_sprite(&mut self) -> SpriteId {
        let id = self.next_id;
        self.next_id += 1;
        self.sprites.push(Sprite::new(id));
        self.active = id;
        id
    }

    pub fn list(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn get(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: SpriteId) -> bool {
        self.get(id).is_some()
    }

    /// Functional update of the matching sprite; unknown id is a no-op.
    pub fn update(&mut self, id: SpriteId, f: impl FnOnce(Sprite) -> Sprite) {
        if let Some(slot) = self.sprites.iter_mut().find(|s| s.id == id) {
            let next = f(*slot);
            *slot = Sprite { id, ..next };
        }
    }

    pub fn active(&self) -> SpriteId {
        self.active
    }

    /// Unknown ids are ignored so the active designation always stays valid.
    pub fn set_active(&mut self, id: SpriteId) {
        if self.contains(id) {
            self.active = id;
        }
    }

    pub fn hero(&self) -> Option<SpriteId> {
        self.hero
    }

    pub fn set_hero(&mut self, id: SpriteId) {
        if self.contains(id) {
            self.hero = Some(id);
        }
    }
}

impl Default for SpriteStore {
    fn default() -> Self {
        Self::new()
    }
}
