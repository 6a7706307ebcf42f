//! Block records and the per-sprite script store.
//!
//! A script is an ordered list of immutable block records keyed by sprite id;
//! list order is execution order. Drafts arrive from the host page as JSON
//! (see [`BlockDraft`]); an incomplete or unrecognized draft is dropped
//! silently rather than raised to the user.

use super::sprite::SpriteId;

/// Default speech-bubble duration in seconds when a say/think block carries none.
pub const DEFAULT_SPEECH_SECS: u32 = 2;

/// Tagged block kind, carrying only the fields the kind needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Move { steps: i32 },
    TurnLeft { degrees: i32 },
    TurnRight { degrees: i32 },
    Goto { x: i32, y: i32 },
    Say { message: String, duration_s: u32 },
    Think { message: String, duration_s: u32 },
    /// Green-flag trigger marker: fires once near run start, no state effect.
    WhenFlagClicked,
}

/// One instruction record: a kind, its target sprite, and an optional
/// execution delay (the scheduler substitutes its default when absent).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub target: SpriteId,
    pub kind: BlockKind,
    pub delay_ms: Option<u32>,
}

impl Block {
    pub fn new(target: SpriteId, kind: BlockKind) -> Self {
        Self {
            target,
            kind,
            delay_ms: None,
        }
    }
}

/// Wire form of a dropped palette block, as sent by the host page.
/// Unknown `kind` strings and missing required fields invalidate the draft.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockDraft {
    pub kind: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub steps: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub degrees: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub x: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub y: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub message: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub duration: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub delay: Option<u32>,
}

impl BlockDraft {
    /// Validates the draft into a block targeting `target`.
    /// `None` when the kind is unknown or a required field is missing.
    pub fn into_block(self, target: SpriteId) -> Option<Block> {
        let kind = match self.kind.as_str() {
            "move" => BlockKind::Move { steps: self.steps? },
            // The palette historically labels the counter-clockwise turn just
            // "turn"; accept both spellings.
            "turn" | "turn_left" => BlockKind::TurnLeft {
                degrees: self.degrees?,
            },
            "turn_right" => BlockKind::TurnRight {
                degrees: self.degrees?,
            },
            "goto" => BlockKind::Goto {
                x: self.x?,
                y: self.y?,
            },
            "say" | "say_duration" => BlockKind::Say {
                message: self.message?,
                duration_s: self.duration.unwrap_or(DEFAULT_SPEECH_SECS),
            },
            "think" | "think_duration" => BlockKind::Think {
                message: self.message?,
                duration_s: self.duration.unwrap_or(DEFAULT_SPEECH_SECS),
            },
            "when_flag_clicked" | "event_flag" => BlockKind::WhenFlagClicked,
            _ => return None,
        };
        Some(Block {
            target,
            kind,
            delay_ms: self.delay,
        })
    }
}

/// Value for a single-field edit. Numeric fields take `Int`, message takes `Text`.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Text(String),
}

/// Per-sprite ordered block lists plus a revision counter.
///
/// Every mutation bumps the revision; the scheduler compares revisions to
/// detect that a running sprite's list identity changed and must restart its
/// walk (this is what makes the collision swap take effect mid-run).
pub struct ScriptStore {
    scripts: std::collections::BTreeMap<SpriteId, Vec<Block>>,
    revision: u64,
}

impl ScriptStore {
    pub fn new() -> Self {
        Self {
            scripts: std::collections::BTreeMap::new(),
            revision: 0,
        }
    }

    /// Creates the (empty) list for a newly added sprite. Idempotent.
    pub fn register(&mut self, id: SpriteId) {
        self.scripts.entry(id).or_default();
    }

    /// Tail append. Returns false (drop ignored) if the sprite owns no list.
    pub fn append(&mut self, id: SpriteId, block: Block) -> bool {
        match self.scripts.get_mut(&id) {
            Some(list) => {
                list.push(block);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Replaces one field of the block at `index`, leaving the rest of the
    /// record intact. Out-of-range index or a field the kind does not carry
    /// is a no-op; returns whether the edit applied.
    pub fn edit_field(
        &mut self,
        id: SpriteId,
        index: usize,
        field: &str,
        value: FieldValue,
    ) -> bool {
        let Some(list) = self.scripts.get_mut(&id) else {
            return false;
        };
        let Some(block) = list.get_mut(index) else {
            return false;
        };
        let applied = match (&mut block.kind, field, value) {
            (BlockKind::Move { steps }, "steps", FieldValue::Int(v)) => {
                *steps = v;
                true
            }
            (BlockKind::TurnLeft { degrees }, "degrees", FieldValue::Int(v))
            | (BlockKind::TurnRight { degrees }, "degrees", FieldValue::Int(v)) => {
                *degrees = v;
                true
            }
            (BlockKind::Goto { x, .. }, "x", FieldValue::Int(v)) => {
                *x = v;
                true
            }
            (BlockKind::Goto { y, .. }, "y", FieldValue::Int(v)) => {
                *y = v;
                true
            }
            (BlockKind::Say { message, .. }, "message", FieldValue::Text(v))
            | (BlockKind::Think { message, .. }, "message", FieldValue::Text(v)) => {
                *message = v;
                true
            }
            (BlockKind::Say { duration_s, .. }, "duration", FieldValue::Int(v))
            | (BlockKind::Think { duration_s, .. }, "duration", FieldValue::Int(v)) => {
                *duration_s = v.max(0) as u32;
                true
            }
            (_, "delay", FieldValue::Int(v)) => {
                block.delay_ms = Some(v.max(0) as u32);
                true
            }
            _ => false,
        };
        if applied {
            self.revision += 1;
        }
        applied
    }

    /// The sprite's script in execution order; empty for unknown ids.
    pub fn list_for(&self, id: SpriteId) -> &[Block] {
        self.scripts.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Bulk exchange of two sprites' lists (the collision "tag" response).
    /// Blocks are retargeted to their new owner so the swapped behavior
    /// actually drives the other sprite.
    pub fn swap(&mut self, a: SpriteId, b: SpriteId) {
        if a == b || !self.scripts.contains_key(&a) || !self.scripts.contains_key(&b) {
            return;
        }
        let mut list_a = self.scripts.remove(&a).unwrap_or_default();
        let mut list_b = self.scripts.remove(&b).unwrap_or_default();
        for blk in &mut list_a {
            blk.target = b;
        }
        for blk in &mut list_b {
            blk.target = a;
        }
        self.scripts.insert(a, list_b);
        self.scripts.insert(b, list_a);
        self.revision += 1;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for ScriptStore {
    fn default() -> Self {
        Self::new()
    }
}
