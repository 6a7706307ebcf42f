//! Browser stage shell: canvas setup, DOM overlays, input wiring and the
//! requestAnimationFrame loop that drives the scheduler.
//!
//! The pure game logic lives in the submodules (sprite / script / interp /
//! scheduler / collision) and never touches the DOM, so it stays natively
//! testable. This module owns the single `StageState` cell, forwards
//! timestamps from the frame loop into `Scheduler::tick`, applies the
//! collision "tag" response (script swap) and renders the result.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, window};

pub mod collision;
pub mod interp;
pub mod scheduler;
pub mod script;
pub mod sprite;

use collision::CollisionTracker;
use interp::SpeechKind;
use scheduler::{Scheduler, StageEvent};
use script::ScriptStore;
#[cfg(feature = "serde_json")]
use script::{BlockDraft, FieldValue};
use sprite::SpriteStore;

/// Canvas geometry: the stage area on top, the sprite strip along the bottom.
const CANVAS_W: u32 = 480;
const CANVAS_H: u32 = 560;
const STRIP_H: f64 = 80.0;
const SLOT_W: f64 = 72.0;

/// Runtime stage state, owned by the frame loop.
struct StageState {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    sprites: SpriteStore,
    scripts: ScriptStore,
    scheduler: Scheduler,
    collisions: CollisionTracker,
}

thread_local! {
    static STAGE_STATE: std::cell::RefCell<Option<StageState>> =
        std::cell::RefCell::new(None);
}

type FrameCallback = std::rc::Rc<std::cell::RefCell<Option<Closure<dyn FnMut(f64)>>>>;

// --- WASM entry --------------------------------------------------------------

#[wasm_bindgen]
pub fn start_stage() -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    // Create / reuse the stage canvas.
    let canvas: HtmlCanvasElement = if let Some(el) = doc.get_element_by_id("bc-stage") {
        el.dyn_into()?
    } else {
        let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        c.set_id("bc-stage");
        c.set_width(CANVAS_W);
        c.set_height(CANVAS_H);
        c.set_attribute("style", "position:fixed; left:50%; top:50%; transform:translate(-50%,-50%); box-shadow:0 0 24px 0 rgba(0,0,0,0.18); border-radius:12px; border:2px solid #222; background:#ffffff; z-index:20;").ok();
        doc.body().unwrap().append_child(&c)?;
        c
    };
    let ctx: CanvasRenderingContext2d = canvas.get_context("2d")?.unwrap().dyn_into()?;
    ctx.set_text_align("center");

    let sprites = SpriteStore::new();
    let mut scripts = ScriptStore::new();
    for s in sprites.list() {
        scripts.register(s.id);
    }

    let state = StageState {
        canvas: canvas.clone(),
        ctx,
        sprites,
        scripts,
        scheduler: Scheduler::new(),
        collisions: CollisionTracker::new(),
    };
    STAGE_STATE.with(|cell| cell.replace(Some(state)));

    // Status overlay (run phase / active sprite / block count).
    if doc.get_element_by_id("bc-status").is_none() {
        if let Some(body) = doc.body() {
            let div = doc.create_element("div")?;
            div.set_id("bc-status");
            div.set_text_content(Some("idle"));
            div.set_attribute("style", "position:fixed; top:10px; left:12px; font-family:'Fira Code', monospace; font-size:14px; padding:4px 8px; background:rgba(0,0,0,0.42); border:1px solid #333; border-radius:6px; color:#ffd166; z-index:45; letter-spacing:0.5px;").ok();
            body.append_child(&div)?;
        }
    }

    // Keyboard: Space / g toggles the green flag, Escape stops.
    {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::KeyboardEvent| {
            let key = evt.key();
            if key == " " || key == "g" {
                toggle_green_flag();
            } else if key == "Escape" {
                halt_run();
            }
        }) as Box<dyn FnMut(_)>);
        doc.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    // Clicks on the bottom strip: select a sprite (active + hero, as the
    // thumbnail click has always done) or add a new one on the "+" slot.
    {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::MouseEvent| {
            let x = evt.offset_x() as f64;
            let y = evt.offset_y() as f64;
            if y < CANVAS_H as f64 - STRIP_H {
                return;
            }
            let slot = (x / SLOT_W).floor() as usize;
            STAGE_STATE.with(|cell| {
                if let Some(state) = cell.borrow_mut().as_mut() {
                    let count = state.sprites.list().len();
                    if slot < count {
                        let id = state.sprites.list()[slot].id;
                        state.sprites.set_active(id);
                        state.sprites.set_hero(id);
                    } else if slot == count {
                        let id = state.sprites.add_sprite();
                        state.scripts.register(id);
                    }
                }
            });
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }

    start_stage_loop();
    Ok(())
}

// --- Exported host API -------------------------------------------------------

/// Green-flag click: starts a run, or stops the one in progress.
#[wasm_bindgen]
pub fn green_flag() {
    toggle_green_flag();
}

/// External stop signal; a no-op when idle.
#[wasm_bindgen]
pub fn stop_run() {
    halt_run();
}

/// Adds a sprite with the default pose, registers its empty script and makes
/// it active. Returns the new id (0 when the stage is not started).
#[wasm_bindgen]
pub fn add_sprite() -> u32 {
    STAGE_STATE.with(|cell| {
        cell.borrow_mut()
            .as_mut()
            .map(|state| {
                let id = state.sprites.add_sprite();
                state.scripts.register(id);
                id
            })
            .unwrap_or(0)
    })
}

#[wasm_bindgen]
pub fn set_active_sprite(id: u32) {
    STAGE_STATE.with(|cell| {
        if let Some(state) = cell.borrow_mut().as_mut() {
            state.sprites.set_active(id);
        }
    });
}

#[wasm_bindgen]
pub fn set_hero_sprite(id: u32) {
    STAGE_STATE.with(|cell| {
        if let Some(state) = cell.borrow_mut().as_mut() {
            state.sprites.set_hero(id);
        }
    });
}

#[wasm_bindgen]
pub fn sprite_count() -> u32 {
    STAGE_STATE.with(|cell| {
        cell.borrow()
            .as_ref()
            .map(|state| state.sprites.list().len() as u32)
            .unwrap_or(0)
    })
}

/// Drops a palette block (JSON draft) onto a sprite's script. Incomplete or
/// unrecognized drafts are ignored; returns whether the block was appended.
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn drop_block(sprite_id: u32, draft_json: &str) -> bool {
    let Ok(draft) = serde_json::from_str::<BlockDraft>(draft_json) else {
        return false;
    };
    STAGE_STATE.with(|cell| {
        let mut cell = cell.borrow_mut();
        let Some(state) = cell.as_mut() else {
            return false;
        };
        if !state.sprites.contains(sprite_id) {
            return false;
        }
        match draft.into_block(sprite_id) {
            Some(block) => state.scripts.append(sprite_id, block),
            None => false,
        }
    })
}

/// Replaces one field of the block at `index` in a sprite's script.
/// `value_json` is a bare JSON scalar (number or string).
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn edit_block_field(sprite_id: u32, index: u32, field: &str, value_json: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(value_json) else {
        return false;
    };
    let value = match value {
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(v) => FieldValue::Int(v as i32),
            None => return false,
        },
        serde_json::Value::String(s) => FieldValue::Text(s),
        _ => return false,
    };
    STAGE_STATE.with(|cell| {
        cell.borrow_mut()
            .as_mut()
            .map(|state| {
                state
                    .scripts
                    .edit_field(sprite_id, index as usize, field, value)
            })
            .unwrap_or(false)
    })
}

// --- Run control -------------------------------------------------------------

fn toggle_green_flag() {
    let now = crate::performance_now();
    STAGE_STATE.with(|cell| {
        if let Some(state) = cell.borrow_mut().as_mut() {
            if state.scheduler.is_running() {
                state.scheduler.stop();
                state.collisions.clear();
                web_sys::console::log_1(&"blockcat: run stopped".into());
            } else {
                state
                    .scheduler
                    .start(now, &state.sprites, &state.scripts);
                state.collisions.clear();
                web_sys::console::log_1(&"blockcat: run started".into());
            }
        }
    });
}

fn halt_run() {
    STAGE_STATE.with(|cell| {
        if let Some(state) = cell.borrow_mut().as_mut() {
            if state.scheduler.is_running() {
                state.scheduler.stop();
                state.collisions.clear();
                web_sys::console::log_1(&"blockcat: run stopped".into());
            }
        }
    });
}

// --- Frame loop --------------------------------------------------------------

fn start_stage_loop() {
    let f: FrameCallback = std::rc::Rc::new(std::cell::RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        STAGE_STATE.with(|cell| {
            if let Some(state) = cell.borrow_mut().as_mut() {
                stage_tick(state, ts);
            }
        });
        if let Some(w) = window() {
            let _ =
                w.request_animation_frame(f.borrow().as_ref().unwrap().as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));
    if let Some(w) = window() {
        let _ = w.request_animation_frame(g.borrow().as_ref().unwrap().as_ref().unchecked_ref());
    }
}

fn stage_tick(state: &mut StageState, now: f64) {
    let events = state
        .scheduler
        .tick(now, &mut state.sprites, &state.scripts);
    for event in &events {
        if let StageEvent::RunFinished = event {
            state.collisions.clear();
            web_sys::console::log_1(&"blockcat: run finished".into());
        }
    }

    if state.scheduler.is_running() {
        let fired = state.collisions.scan(state.sprites.list(), now);
        for (a, b) in fired {
            web_sys::console::log_1(
                &format!("blockcat: collision between sprite {a} and sprite {b}").into(),
            );
            // External "tag" policy: the colliding sprites trade scripts.
            state.scripts.swap(a, b);
        }
    }

    render_stage(state, now);
    update_status(state);
}

fn update_status(state: &StageState) {
    if let Some(doc) = window().and_then(|w| w.document()) {
        if let Some(el) = doc.get_element_by_id("bc-status") {
            let phase = if state.scheduler.is_running() {
                "running"
            } else {
                "idle"
            };
            let active = state.sprites.active();
            let blocks = state.scripts.list_for(active).len();
            el.set_text_content(Some(&format!(
                "{phase} | sprite {active} | {blocks} blocks"
            )));
        }
    }
}

// --- Rendering ---------------------------------------------------------------

fn render_stage(state: &StageState, _now: f64) {
    let ctx = &state.ctx;
    let w = state.canvas.width() as f64;
    let h = state.canvas.height() as f64;
    let stage_h = h - STRIP_H;

    ctx.set_fill_style_str("#ffffff");
    ctx.fill_rect(0.0, 0.0, w, h);

    // Faint center cross so motion is readable against the blank stage.
    ctx.set_stroke_style_str("rgba(0,0,0,0.08)");
    ctx.set_line_width(1.0);
    line(ctx, w / 2.0, 0.0, w / 2.0, stage_h);
    line(ctx, 0.0, stage_h / 2.0, w, stage_h / 2.0);

    let hero = state.sprites.hero();
    let active = state.sprites.active();

    for s in state.sprites.list() {
        let cx = w / 2.0 + s.x as f64;
        let cy = stage_h / 2.0 + s.y as f64;
        let size = s.width.max(1) as f64;

        ctx.save();
        ctx.translate(cx, cy).ok();
        ctx.rotate((s.rotation as f64).to_radians()).ok();
        ctx.set_font(&format!("{}px serif", size as u32));
        ctx.fill_text("🐱", 0.0, size * 0.35).ok();
        ctx.restore();

        if hero == Some(s.id) {
            ctx.set_stroke_style_str("#3fa34d");
            ctx.set_line_width(3.0);
            ctx.begin_path();
            ctx.arc(cx, cy, size * 0.75, 0.0, std::f64::consts::TAU).ok();
            ctx.stroke();
        }
        if active == s.id {
            ctx.set_stroke_style_str("#4aa3ff");
            ctx.set_line_width(2.0);
            ctx.stroke_rect(cx - size * 0.6, cy - size * 0.6, size * 1.2, size * 1.2);
        }
    }

    // Speech bubble above the active sprite.
    if let Some((text, kind)) = state.scheduler.speech() {
        if let Some(s) = state.sprites.get(active) {
            let cx = w / 2.0 + s.x as f64;
            let cy = stage_h / 2.0 + s.y as f64;
            draw_speech_bubble(ctx, cx, cy - s.height as f64, text, kind);
        }
    }

    render_strip(state, w, h);
}

fn draw_speech_bubble(
    ctx: &CanvasRenderingContext2d,
    cx: f64,
    top_y: f64,
    text: &str,
    kind: SpeechKind,
) {
    let bw = (text.chars().count() as f64 * 9.0 + 24.0).max(60.0);
    let bh = 30.0;
    let bx = cx - bw / 2.0;
    let by = top_y - bh;

    ctx.set_fill_style_str("#ffffff");
    ctx.set_stroke_style_str("#999999");
    ctx.set_line_width(1.5);
    ctx.fill_rect(bx, by, bw, bh);
    ctx.stroke_rect(bx, by, bw, bh);

    match kind {
        SpeechKind::Say => {
            // Pointed tail toward the sprite.
            ctx.begin_path();
            ctx.move_to(cx - 6.0, by + bh);
            ctx.line_to(cx, by + bh + 10.0);
            ctx.line_to(cx + 6.0, by + bh);
            ctx.set_fill_style_str("#ffffff");
            ctx.fill();
            ctx.stroke();
        }
        SpeechKind::Think => {
            // Trailing thought dots.
            for (step, r) in [(1.0, 4.0), (2.0, 2.5)] {
                ctx.begin_path();
                ctx.arc(cx, by + bh + 5.0 * step, r, 0.0, std::f64::consts::TAU)
                    .ok();
                ctx.set_fill_style_str("#ffffff");
                ctx.fill();
                ctx.stroke();
            }
        }
    }

    ctx.set_fill_style_str("#222222");
    ctx.set_font("14px 'Fira Code', monospace");
    ctx.fill_text(text, cx, by + bh * 0.65).ok();
}

fn render_strip(state: &StageState, w: f64, h: f64) {
    let ctx = &state.ctx;
    let top = h - STRIP_H;

    ctx.set_fill_style_str("#f2f2f2");
    ctx.fill_rect(0.0, top, w, STRIP_H);
    ctx.set_stroke_style_str("#cccccc");
    ctx.set_line_width(1.0);
    line(ctx, 0.0, top, w, top);

    let hero = state.sprites.hero();
    let active = state.sprites.active();

    for (i, s) in state.sprites.list().iter().enumerate() {
        let x = i as f64 * SLOT_W + 8.0;
        let y = top + 8.0;
        let side = SLOT_W - 16.0;
        ctx.set_fill_style_str("#ffffff");
        ctx.fill_rect(x, y, side, side);
        let border = if active == s.id {
            "#4aa3ff"
        } else if hero == Some(s.id) {
            "#3fa34d"
        } else {
            "#cccccc"
        };
        ctx.set_stroke_style_str(border);
        ctx.set_line_width(if active == s.id || hero == Some(s.id) {
            3.0
        } else {
            1.0
        });
        ctx.stroke_rect(x, y, side, side);
        ctx.set_font("28px serif");
        ctx.fill_text("🐱", x + side / 2.0, y + side * 0.62).ok();
        ctx.set_fill_style_str("#444444");
        ctx.set_font("10px 'Fira Code', monospace");
        ctx.fill_text(&format!("sprite {}", s.id), x + side / 2.0, y + side - 2.0)
            .ok();
    }

    // "+" slot for adding a sprite.
    let x = state.sprites.list().len() as f64 * SLOT_W + 8.0;
    let y = top + 8.0;
    let side = SLOT_W - 16.0;
    ctx.set_fill_style_str("#ffffff");
    ctx.fill_rect(x, y, side, side);
    ctx.set_stroke_style_str("#cccccc");
    ctx.set_line_width(1.0);
    ctx.stroke_rect(x, y, side, side);
    ctx.set_fill_style_str("#888888");
    ctx.set_font("32px 'Fira Code', monospace");
    ctx.fill_text("+", x + side / 2.0, y + side * 0.68).ok();
}

fn line(ctx: &CanvasRenderingContext2d, x1: f64, y1: f64, x2: f64, y2: f64) {
    ctx.begin_path();
    ctx.move_to(x1, y1);
    ctx.line_to(x2, y2);
    ctx.stroke();
}
