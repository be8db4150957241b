//! Debounced push-button driver and edge classifier.
//!
//! ## Hardware
//!
//! Active-low momentary switch.  The GPIO interrupt calls
//! [`ButtonDriver::on_press`] / [`ButtonDriver::on_release`] with a
//! millisecond timestamp; [`ButtonDriver::poll`] (timer or main loop)
//! reports a long press while the button is still held.
//!
//! ## Edges
//!
//! | Edge          | Condition                                  |
//! |---------------|--------------------------------------------|
//! | `Clicked`     | Released after debounce, before threshold  |
//! | `LongPressed` | Held for at least `long_press_ms`          |
//!
//! Each press reports at most one edge.  Edges not in the registered mask
//! are never reported.

use std::sync::Arc;

use bitflags::bitflags;

use crate::events::{AppEventQueue, ButtonEdge, ButtonPayload, Event};

const DEBOUNCE_MS: u32 = 50;

bitflags! {
    /// Edges a callback subscribes to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ButtonEvents: u8 {
        const CLICKED      = 0b0000_0001;
        const LONG_PRESSED = 0b0000_0010;
    }
}

impl ButtonEvents {
    pub const fn of(edge: ButtonEdge) -> Self {
        match edge {
            ButtonEdge::Clicked => Self::CLICKED,
            ButtonEdge::LongPressed => Self::LONG_PRESSED,
        }
    }
}

/// Which physical button an edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    Left,
    Right,
    Generic,
}

/// Callback invoked with each reported edge.  Runs in interrupt context:
/// must not block or allocate.
pub type ButtonCallback = Box<dyn FnMut(ButtonId, ButtonEdge) + Send>;

pub struct ButtonDriver {
    id: ButtonId,
    mask: ButtonEvents,
    long_press_ms: u32,
    callback: Option<ButtonCallback>,
    pressed_at: Option<u32>,
    long_reported: bool,
}

impl ButtonDriver {
    /// Claim the button.  Nothing is reported until a callback is set.
    pub fn open(id: ButtonId) -> Self {
        Self {
            id,
            mask: ButtonEvents::empty(),
            long_press_ms: u32::MAX,
            callback: None,
            pressed_at: None,
            long_reported: false,
        }
    }

    pub fn id(&self) -> ButtonId {
        self.id
    }

    /// Register `callback` for the edges in `mask`.
    pub fn set_callback(&mut self, mask: ButtonEvents, long_press_ms: u32, callback: ButtonCallback) {
        self.mask = mask;
        self.long_press_ms = long_press_ms.max(DEBOUNCE_MS);
        self.callback = Some(callback);
    }

    /// ISR: falling edge.
    pub fn on_press(&mut self, now_ms: u32) {
        if self.pressed_at.is_none() {
            self.pressed_at = Some(now_ms);
            self.long_reported = false;
        }
    }

    /// ISR: rising edge.
    pub fn on_release(&mut self, now_ms: u32) {
        let Some(since) = self.pressed_at.take() else {
            return;
        };
        if self.long_reported {
            return;
        }
        let held = now_ms.wrapping_sub(since);
        if held >= self.long_press_ms {
            self.emit(ButtonEdge::LongPressed);
        } else if held >= DEBOUNCE_MS {
            self.emit(ButtonEdge::Clicked);
        }
    }

    /// Report a long press while the button is still down.
    pub fn poll(&mut self, now_ms: u32) {
        let Some(since) = self.pressed_at else {
            return;
        };
        if !self.long_reported && now_ms.wrapping_sub(since) >= self.long_press_ms {
            self.long_reported = true;
            self.emit(ButtonEdge::LongPressed);
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    fn emit(&mut self, edge: ButtonEdge) {
        if !self.mask.contains(ButtonEvents::of(edge)) {
            return;
        }
        if let Some(cb) = self.callback.as_mut() {
            cb(self.id, edge);
        }
    }
}

// ── Edge classifier ───────────────────────────────────────────

/// Map a raw edge from `button` to its queue event.
pub const fn classify(button: ButtonId, edge: ButtonEdge) -> Event {
    let payload = ButtonPayload {
        edge,
        raw_action: ButtonEvents::of(edge).bits(),
    };
    match button {
        ButtonId::Left => Event::ButtonLeft(payload),
        ButtonId::Right => Event::ButtonRight(payload),
        ButtonId::Generic => Event::GenericButton(payload),
    }
}

/// A button callback that classifies each edge and pushes exactly one
/// event.  A full queue drops the edge; the queue counts it.
pub fn queue_callback(queue: Arc<AppEventQueue>) -> ButtonCallback {
    Box::new(move |button, edge| {
        let _ = queue.try_push(classify(button, edge));
    })
}
