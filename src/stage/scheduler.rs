//! Animation scheduler: the Idle -> Running -> Idle state machine that walks
//! every sprite's script over time.
//!
//! All timing is deadline-based: per-block delays, the speech-bubble countdown
//! and run bookkeeping compare `performance.now()`-style timestamps passed
//! into `tick`, so there are no host timer handles to cancel. Stopping a run
//! clears the state synchronously and a stale deadline can never fire
//! afterwards. This also makes the whole machine testable with a simulated
//! clock.

use std::collections::{BTreeMap, HashSet};

use super::interp::{self, Action, SpeechKind};
use super::script::{BlockKind, ScriptStore};
use super::sprite::{SpriteId, SpriteStore};

/// Delay before a block fires when the record carries no delay of its own.
pub const DEFAULT_BLOCK_DELAY_MS: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
}

/// Outbound notifications raised by a tick, consumed by the shell.
#[derive(Clone, Debug, PartialEq)]
pub enum StageEvent {
    SpeechShown { text: String, kind: SpeechKind },
    SpeechHidden,
    RunFinished,
}

/// Per-sprite walk state: the cursor into its script and the armed deadline
/// for the instruction under the cursor (if any).
#[derive(Clone, Copy, Debug, Default)]
struct SpriteRun {
    cursor: usize,
    due: Option<f64>,
}

#[derive(Clone, Debug)]
struct SpeechState {
    text: String,
    kind: SpeechKind,
    until: f64,
}

pub struct Scheduler {
    phase: Phase,
    runs: BTreeMap<SpriteId, SpriteRun>,
    /// (sprite, index) pairs already executed this run — the at-most-once guard.
    executed: HashSet<(SpriteId, usize)>,
    /// Green-flag blocks of the active sprite, armed to fire once near start:
    /// (sprite, index, due).
    startup: Vec<(SpriteId, usize, f64)>,
    speech: Option<SpeechState>,
    script_rev: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            runs: BTreeMap::new(),
            executed: HashSet::new(),
            startup: Vec::new(),
            speech: None,
            script_rev: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Cursor of the given sprite, while a run is in progress.
    pub fn cursor(&self, id: SpriteId) -> Option<usize> {
        self.runs.get(&id).map(|r| r.cursor)
    }

    /// Currently visible speech bubble, if any.
    pub fn speech(&self) -> Option<(&str, SpeechKind)> {
        self.speech.as_ref().map(|s| (s.text.as_str(), s.kind))
    }

    /// Idle -> Running. Resets every cursor, clears the executed markers and
    /// schedules the active sprite's green-flag blocks to fire once near the
    /// start of the run (after their own delay, default immediate).
    pub fn start(&mut self, now: f64, sprites: &SpriteStore, scripts: &ScriptStore) {
        self.phase = Phase::Running;
        self.rearm(sprites, scripts);
        let active = sprites.active();
        for (idx, block) in scripts.list_for(active).iter().enumerate() {
            if block.kind == BlockKind::WhenFlagClicked {
                let delay = block.delay_ms.map(f64::from).unwrap_or(0.0);
                self.startup.push((active, idx, now + delay));
            }
        }
    }

    /// Running -> Idle on external stop. Synchronously discards every armed
    /// deadline and hides a pending speech bubble; later ticks are no-ops.
    pub fn stop(&mut self) -> Vec<StageEvent> {
        let mut events = Vec::new();
        self.phase = Phase::Idle;
        self.runs.clear();
        self.executed.clear();
        self.startup.clear();
        if self.speech.take().is_some() {
            events.push(StageEvent::SpeechHidden);
        }
        events
    }

    /// One cooperative tick at timestamp `now`.
    ///
    /// While Running: fires due green-flag blocks, advances each sprite's walk
    /// by at most one instruction, and transitions to Idle once every sprite
    /// with a non-empty script is exhausted. Speech expiry is handled in any
    /// phase since a bubble may outlive the run that raised it.
    pub fn tick(
        &mut self,
        now: f64,
        sprites: &mut SpriteStore,
        scripts: &ScriptStore,
    ) -> Vec<StageEvent> {
        let mut events = Vec::new();

        if let Some(s) = &self.speech {
            if now >= s.until {
                self.speech = None;
                events.push(StageEvent::SpeechHidden);
            }
        }

        if self.phase != Phase::Running {
            return events;
        }

        // A mid-run list-identity change (append, edit, collision swap)
        // restarts the walk from scratch.
        if scripts.revision() != self.script_rev {
            self.rearm(sprites, scripts);
        }

        // Green-flag firings: effect-free, but marked executed so the cursor
        // walk never applies them a second time.
        let pending: Vec<_> = self.startup.drain(..).collect();
        for (sid, idx, due) in pending {
            if now >= due {
                self.executed.insert((sid, idx));
            } else {
                self.startup.push((sid, idx, due));
            }
        }

        let active = sprites.active();
        let ids: Vec<SpriteId> = sprites.list().iter().map(|s| s.id).collect();
        let mut all_done = true;
        for id in ids {
            let list = scripts.list_for(id);
            if list.is_empty() {
                // Empty scripts never block the Running -> Idle transition.
                continue;
            }
            let run = self.runs.entry(id).or_default();

            // Skip over instructions already executed this cycle.
            while run.cursor < list.len() && self.executed.contains(&(id, run.cursor)) {
                run.cursor += 1;
                run.due = None;
            }
            if run.cursor >= list.len() {
                continue;
            }
            all_done = false;

            match run.due {
                None => {
                    let delay = list[run.cursor]
                        .delay_ms
                        .map(f64::from)
                        .unwrap_or(DEFAULT_BLOCK_DELAY_MS);
                    run.due = Some(now + delay);
                }
                Some(due) if now >= due => {
                    let index = run.cursor;
                    let block = &list[index];
                    if let Some(snapshot) = sprites.get(block.target).copied() {
                        match interp::apply(block, &snapshot) {
                            Action::Pose(pose) => sprites.update(block.target, |_| pose),
                            Action::Speech {
                                text,
                                kind,
                                seconds,
                            } => {
                                // Speech is only visible for the active sprite;
                                // a new bubble supersedes a pending countdown.
                                if block.target == active {
                                    self.speech = Some(SpeechState {
                                        text: text.clone(),
                                        kind,
                                        until: now + f64::from(seconds) * 1000.0,
                                    });
                                    events.push(StageEvent::SpeechShown { text, kind });
                                }
                            }
                            Action::None => {}
                        }
                    }
                    // Unknown target sprite: the instruction is skipped but the
                    // cursor still advances.
                    let run = self.runs.entry(id).or_default();
                    self.executed.insert((id, index));
                    run.cursor = index + 1;
                    run.due = None;
                }
                Some(_) => {}
            }
        }

        if all_done && self.startup.is_empty() {
            self.phase = Phase::Idle;
            self.runs.clear();
            self.executed.clear();
            events.push(StageEvent::RunFinished);
        }

        events
    }

    fn rearm(&mut self, sprites: &SpriteStore, scripts: &ScriptStore) {
        self.runs.clear();
        for sprite in sprites.list() {
            self.runs.insert(sprite.id, SpriteRun::default());
        }
        self.executed.clear();
        self.startup.clear();
        self.script_rev = scripts.revision();
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
