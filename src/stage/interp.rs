//! Pure block interpreter.
//!
//! `apply` maps one block record plus the current target-sprite snapshot to
//! either a new pose or a transient speech effect. It knows nothing about
//! timing, the run state machine, or which sprite is active — the scheduler
//! owns all of that.

use super::script::{Block, BlockKind};
use super::sprite::Sprite;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeechKind {
    Say,
    Think,
}

/// Outcome of applying one block to a sprite snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Commit this pose to the target sprite.
    Pose(Sprite),
    /// Show a speech bubble for `seconds` (caller decides visibility).
    Speech {
        text: String,
        kind: SpeechKind,
        seconds: u32,
    },
    /// No state effect (trigger markers).
    None,
}

/// Applies `block` to `sprite`, returning the resulting action.
///
/// `move` shifts along the x-axis regardless of rotation — intentional,
/// matching the product behavior rather than conventional heading-relative
/// sprite motion.
pub fn apply(block: &Block, sprite: &Sprite) -> Action {
    match &block.kind {
        BlockKind::Move { steps } => Action::Pose(Sprite {
            x: sprite.x + steps,
            ..*sprite
        }),
        BlockKind::TurnLeft { degrees } => Action::Pose(Sprite {
            rotation: sprite.rotation + degrees,
            ..*sprite
        }),
        BlockKind::TurnRight { degrees } => Action::Pose(Sprite {
            rotation: sprite.rotation - degrees,
            ..*sprite
        }),
        BlockKind::Goto { x, y } => Action::Pose(Sprite {
            x: *x,
            y: *y,
            ..*sprite
        }),
        BlockKind::Say {
            message,
            duration_s,
        } => Action::Speech {
            text: message.clone(),
            kind: SpeechKind::Say,
            seconds: *duration_s,
        },
        BlockKind::Think {
            message,
            duration_s,
        } => Action::Speech {
            text: message.clone(),
            kind: SpeechKind::Think,
            seconds: *duration_s,
        },
        BlockKind::WhenFlagClicked => Action::None,
    }
}
