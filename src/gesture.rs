// gesture.rs — 拖拽 / 点击判别
//
// Idle → Pressed → (Dragging | tap on release)
//
// - any movement while pressed switches to Dragging
// - release before the tap threshold without having dragged is a tap
// - everything else ends as a drag, even with zero movement
//
// Mouse and the first touch point are handled the same way; other touch
// points are ignored until the active one lifts.

use glam::DVec2;
use std::time::{Duration, Instant};

pub const DEFAULT_TAP_THRESHOLD: Duration = Duration::from_millis(200);
pub const DEFAULT_CONTROLS_REVEAL_DELAY: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerId {
    Mouse,
    Touch(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Pressed,
    Dragging,
}

/// What a release resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Tap { position: DVec2 },
    DragEnd,
    /// Release from a pointer that does not own the gesture.
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct ActiveGesture {
    pointer: PointerId,
    started_at: Instant,
    last: DVec2,
    dragging: bool,
}

/// Debounced "show the controls overlay" hint.
#[derive(Debug, Clone, Copy)]
pub struct ControlsHint {
    hidden: bool,
    reveal_at: Option<Instant>,
    delay: Duration,
}

impl ControlsHint {
    pub fn new(delay: Duration) -> Self {
        Self {
            hidden: false,
            reveal_at: None,
            delay,
        }
    }

    fn hide(&mut self) {
        self.hidden = true;
        self.reveal_at = None;
    }

    fn schedule_reveal(&mut self, now: Instant) {
        self.reveal_at = Some(now + self.delay);
    }

    pub fn visible(&self, now: Instant) -> bool {
        match (self.hidden, self.reveal_at) {
            (false, _) => true,
            (true, Some(at)) => now >= at,
            (true, None) => false,
        }
    }
}

pub struct GestureController {
    active: Option<ActiveGesture>,
    tap_threshold: Duration,
    controls: ControlsHint,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(DEFAULT_TAP_THRESHOLD, DEFAULT_CONTROLS_REVEAL_DELAY)
    }
}

impl GestureController {
    pub fn new(tap_threshold: Duration, controls_reveal_delay: Duration) -> Self {
        Self {
            active: None,
            tap_threshold,
            controls: ControlsHint::new(controls_reveal_delay),
        }
    }

    pub fn phase(&self) -> GesturePhase {
        match self.active {
            None => GesturePhase::Idle,
            Some(g) if g.dragging => GesturePhase::Dragging,
            Some(_) => GesturePhase::Pressed,
        }
    }

    /// Pointer that owns the current gesture, if any.
    pub fn active_pointer(&self) -> Option<PointerId> {
        self.active.map(|g| g.pointer)
    }

    pub fn controls_visible(&self, now: Instant) -> bool {
        self.controls.visible(now)
    }

    /// Starts a gesture. Returns `false` if another pointer already owns one.
    pub fn press(&mut self, pointer: PointerId, position: DVec2, now: Instant) -> bool {
        if let Some(active) = self.active {
            if active.pointer != pointer {
                log::trace!("ignoring {pointer:?}, {:?} is active", active.pointer);
                return false;
            }
        }
        self.active = Some(ActiveGesture {
            pointer,
            started_at: now,
            last: position,
            dragging: false,
        });
        self.controls.hide();
        true
    }

    /// Feeds a move. Returns the drag delta since the previous event, or
    /// `None` if the pointer is not pressed or did not move.
    pub fn move_to(&mut self, pointer: PointerId, position: DVec2) -> Option<DVec2> {
        let active = self.active.as_mut().filter(|g| g.pointer == pointer)?;
        let delta = position - active.last;
        if delta == DVec2::ZERO {
            return None;
        }
        active.last = position;
        active.dragging = true;
        Some(delta)
    }

    pub fn release(&mut self, pointer: PointerId, position: DVec2, now: Instant) -> GestureOutcome {
        let Some(active) = self.active.filter(|g| g.pointer == pointer) else {
            return GestureOutcome::Ignored;
        };
        self.active = None;
        self.controls.schedule_reveal(now);

        let elapsed = now.saturating_duration_since(active.started_at);
        if !active.dragging && elapsed < self.tap_threshold {
            log::debug!("tap at ({:.0}, {:.0}) after {elapsed:?}", position.x, position.y);
            GestureOutcome::Tap { position }
        } else {
            log::debug!("drag ended after {elapsed:?}");
            GestureOutcome::DragEnd
        }
    }

    /// Abandons the gesture without a tap (touch cancelled, focus lost).
    pub fn cancel(&mut self, pointer: PointerId, now: Instant) {
        if self.active.map_or(false, |g| g.pointer == pointer) {
            self.active = None;
            self.controls.schedule_reveal(now);
        }
    }
}
