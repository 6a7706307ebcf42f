//! Blockcat core crate.
//!
//! A Scratch-style block-programming toy: the host page drops instruction
//! blocks onto per-sprite scripts and `start_stage()` boots a canvas stage
//! where the green flag runs every script through the animation scheduler,
//! with speech bubbles and collision "tag" between sprites. The pure
//! scheduling / interpretation logic lives under [`stage`] and is natively
//! testable; only the shell in `stage/mod.rs` touches the browser.

use wasm_bindgen::prelude::*;

pub mod stage;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// -----------------------------------------------------------------------------
// Block palette catalog
// The host page renders these as drag sources; dropping one calls
// `drop_block` with the corresponding draft JSON.
// -----------------------------------------------------------------------------

pub const PALETTE: &[(&str, &str)] = &[
    ("when_flag_clicked", "When ⚑ clicked"),
    ("move", "Move 10 steps"),
    ("turn", "Turn ↺ 15 degrees"),
    ("turn_right", "Turn ↻ 15 degrees"),
    ("goto", "Go to x: 0 y: 0"),
    ("say", "Say Hello!"),
    ("say_duration", "Say Hello! for 2 seconds"),
    ("think", "Think Hmm..."),
    ("think_duration", "Think Hmm... for 2 seconds"),
];

/// Draft JSON a palette entry drops, with the default field values shown on
/// the block face. Unknown kinds yield `None`.
pub fn default_draft(kind: &str) -> Option<&'static str> {
    match kind {
        "when_flag_clicked" => Some(r#"{"kind":"when_flag_clicked"}"#),
        "move" => Some(r#"{"kind":"move","steps":10}"#),
        "turn" => Some(r#"{"kind":"turn","degrees":15}"#),
        "turn_right" => Some(r#"{"kind":"turn_right","degrees":15}"#),
        "goto" => Some(r#"{"kind":"goto","x":0,"y":0}"#),
        "say" => Some(r#"{"kind":"say","message":"Hello!"}"#),
        "say_duration" => Some(r#"{"kind":"say_duration","message":"Hello!","duration":2}"#),
        "think" => Some(r#"{"kind":"think","message":"Hmm..."}"#),
        "think_duration" => Some(r#"{"kind":"think_duration","message":"Hmm...","duration":2}"#),
        _ => None,
    }
}

/// Palette draft lookup for the host page.
#[wasm_bindgen]
pub fn palette_draft(kind: &str) -> Option<String> {
    default_draft(kind).map(str::to_owned)
}

// Timestamp helper shared by run control outside the frame loop (the loop
// itself receives its timestamp from requestAnimationFrame).
pub(crate) fn performance_now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
