//! Interrupt-safe application event queue.
//!
//! Events are produced by:
//! - Button callbacks (interrupt context)
//! - Timer service callbacks (identify effects, LED animation)
//! - Protocol-stack callbacks (identify start/stop, device operational)
//! - Actuator completion callbacks (any thread)
//!
//! Events are consumed by exactly one [`Dispatcher`](crate::dispatcher::Dispatcher),
//! which processes them one at a time in global arrival order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Button ISR  │────▶│              │     │              │
//! │ Timer task  │────▶│  EventQueue  │────▶│  Dispatcher  │
//! │ Stack cb    │────▶│  (bounded)   │     │  (consumer)  │
//! │ Actuator cb │────▶│              │     │              │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use futures_lite::future::block_on;
use log::warn;

use crate::actions::{Action, Actor};
use crate::identify::IdentifyEffect;

/// Capacity of the application event queue.
pub const APP_EVENT_QUEUE_SIZE: usize = 10;

/// The application's event queue.
pub type AppEventQueue = EventQueue<APP_EVENT_QUEUE_SIZE>;

// ── Event record ──────────────────────────────────────────────

/// Edge reported by the button driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Clicked,
    LongPressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPayload {
    pub edge: ButtonEdge,
    /// Raw driver action code, forwarded untouched.
    pub raw_action: u8,
}

impl ButtonPayload {
    pub const fn new(edge: ButtonEdge) -> Self {
        Self { edge, raw_action: 0 }
    }
}

/// Well-known handlers an [`Event::AppCallback`] can carry.
///
/// Producers attach one of these to ask for specific logic to run on the
/// dispatcher thread; the dispatcher forwards it without interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppHandler {
    /// Drive the device's actuator, e.g. on a remote on/off command.
    ActuatorCommand { action: Action, actor: Actor },
    /// An actuator finished an action; refresh local indication.
    ActionCompleted(Action),
    /// Apply an identify effect requested by the stack.
    IdentifyEffect { effect: IdentifyEffect, variant: u8 },
    /// An identify effect timer elapsed.  Only the latest arming's
    /// generation ends the running effect.
    IdentifyEffectDone { generation: u32 },
    /// Drive the alarm indicator LED.
    AlarmIndicator { on: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackPayload {
    pub handler: AppHandler,
    /// Opaque argument forwarded to the handler.
    pub arg: u32,
}

impl CallbackPayload {
    pub const fn new(handler: AppHandler) -> Self {
        Self { handler, arg: 0 }
    }
}

/// One queued occurrence.
///
/// Always copied into the queue; never references producer-owned memory.
/// The payload a variant carries is fixed by the variant itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    None,
    ButtonLeft(ButtonPayload),
    ButtonRight(ButtonPayload),
    GenericButton(ButtonPayload),
    IdentifyStart,
    IdentifyStop,
    DeviceOperational,
    AppCallback(CallbackPayload),
}

/// Payload-free discriminant of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    None,
    ButtonLeft,
    ButtonRight,
    GenericButton,
    IdentifyStart,
    IdentifyStop,
    DeviceOperational,
    AppCallback,
}

impl Event {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::None => EventKind::None,
            Self::ButtonLeft(_) => EventKind::ButtonLeft,
            Self::ButtonRight(_) => EventKind::ButtonRight,
            Self::GenericButton(_) => EventKind::GenericButton,
            Self::IdentifyStart => EventKind::IdentifyStart,
            Self::IdentifyStop => EventKind::IdentifyStop,
            Self::DeviceOperational => EventKind::DeviceOperational,
            Self::AppCallback(_) => EventKind::AppCallback,
        }
    }

    pub const fn callback(handler: AppHandler) -> Self {
        Self::AppCallback(CallbackPayload::new(handler))
    }

    /// The button payload, if this is a button event.
    pub const fn button(&self) -> Option<ButtonPayload> {
        match self {
            Self::ButtonLeft(p) | Self::ButtonRight(p) | Self::GenericButton(p) => Some(*p),
            _ => None,
        }
    }
}

// ── Bounded MPSC queue ────────────────────────────────────────
//
// Any number of producers (ISR, timer task, stack callbacks) push with
// `try_push`; the single dispatcher pops.  The channel's critical-section
// mutex makes pushes safe with interrupts masked; nothing here allocates.

/// Bounded FIFO of [`Event`]s with capacity `N`.
pub struct EventQueue<const N: usize> {
    channel: Channel<CriticalSectionRawMutex, Event, N>,
    dropped: AtomicU32,
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventQueue<N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue without blocking.
    /// Safe to call from ISR context (bounded critical section, no heap).
    /// Returns `false` if the queue is full; the event is dropped and the
    /// queued events are left untouched.
    pub fn try_push(&self, event: Event) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Task-context push that logs a drop. Never retries, never blocks.
    pub fn post(&self, event: Event) -> bool {
        let queued = self.try_push(event);
        if !queued {
            warn!("events: queue full, dropped {:?}", event.kind());
        }
        queued
    }

    /// Dequeue the oldest event.
    ///
    /// * `None`: block until an event arrives.
    /// * `Some(Duration::ZERO)`: return immediately.
    /// * `Some(d)`: block at most `d`; `None` on timeout.
    ///
    /// Only the single consumer may call this.
    pub fn pop(&self, timeout: Option<Duration>) -> Option<Event> {
        match timeout {
            None => Some(block_on(self.channel.receive())),
            Some(d) if d.is_zero() => self.try_pop(),
            Some(d) => {
                let wait = embassy_time::Duration::from_micros(
                    u64::try_from(d.as_micros()).unwrap_or(u64::MAX),
                );
                block_on(embassy_time::with_timeout(wait, self.channel.receive())).ok()
            }
        }
    }

    /// Non-blocking pop. Returns `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<Event> {
        self.channel.try_receive().ok()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Events dropped on a full queue since construction.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
