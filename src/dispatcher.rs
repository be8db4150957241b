//! The single consumer of the application event queue.
//!
//! ```text
//! loop {
//!     event = queue.pop(timeout)        // blocks the dispatcher thread
//!     classify_and_handle(event)        // total over every kind
//!     drain queued events (zero timeout)
//!     periodic tick if due               // LED animation etc.
//! }
//! ```
//!
//! The dispatcher knows nothing about device semantics.  Everything
//! device-specific lives behind [`EventHandler`]; `AppCallback` payloads
//! are forwarded to the handler without inspection.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};

use crate::drivers::button::ButtonId;
use crate::events::{AppEventQueue, ButtonPayload, CallbackPayload, Event};

/// Device-specific reactions.  Every method defaults to a no-op, so a
/// handler only implements what its device uses.
pub trait EventHandler {
    fn on_button(&mut self, _button: ButtonId, _payload: ButtonPayload) {}

    fn on_identify_start(&mut self) {}

    fn on_identify_stop(&mut self) {}

    fn on_device_operational(&mut self) {}

    fn on_callback(&mut self, _payload: CallbackPayload) {}

    /// Period of [`on_tick`](Self::on_tick); `None` disables ticking and
    /// lets the dispatcher block indefinitely.
    fn tick_interval(&self) -> Option<Duration> {
        None
    }

    /// Called at most once per `tick_interval` with the time since the
    /// previous tick.
    fn on_tick(&mut self, _elapsed: Duration) {}
}

/// Wakes and stops a running dispatcher from another thread.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    queue: Arc<AppEventQueue>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
        // A full queue wakes the dispatcher anyway.
        let _ = self.queue.try_push(Event::None);
    }
}

pub struct Dispatcher<H> {
    queue: Arc<AppEventQueue>,
    handler: H,
    stop: Arc<AtomicBool>,
    last_tick: Instant,
    dispatched: u64,
}

impl<H: EventHandler> Dispatcher<H> {
    pub fn new(queue: Arc<AppEventQueue>, handler: H) -> Self {
        Self {
            queue,
            handler,
            stop: Arc::new(AtomicBool::new(false)),
            last_tick: Instant::now(),
            dispatched: 0,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop.clone(),
            queue: self.queue.clone(),
        }
    }

    /// Events handled so far, `None` events included.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Route one event to the handler.  Total: unknown or `None` events
    /// are no-ops.
    pub fn dispatch(&mut self, event: Event) {
        self.dispatched += 1;
        match event {
            Event::None => {}
            Event::ButtonLeft(p) => self.handler.on_button(ButtonId::Left, p),
            Event::ButtonRight(p) => self.handler.on_button(ButtonId::Right, p),
            Event::GenericButton(p) => self.handler.on_button(ButtonId::Generic, p),
            Event::IdentifyStart => self.handler.on_identify_start(),
            Event::IdentifyStop => self.handler.on_identify_stop(),
            Event::DeviceOperational => self.handler.on_device_operational(),
            Event::AppCallback(p) => self.handler.on_callback(p),
        }
    }

    /// Handle everything currently queued without blocking.
    pub fn drain(&mut self) -> usize {
        let mut n = 0;
        while let Some(event) = self.queue.pop(Some(Duration::ZERO)) {
            self.dispatch(event);
            n += 1;
        }
        n
    }

    /// One loop iteration: wait for an event (or the next tick), handle
    /// it and whatever queued up behind it, then tick if due.  Returns
    /// the number of events handled.
    pub fn run_once(&mut self) -> usize {
        let interval = self.handler.tick_interval();
        let timeout = interval.map(|i| i.saturating_sub(self.last_tick.elapsed()));

        let mut handled = 0;
        if let Some(event) = self.queue.pop(timeout) {
            self.dispatch(event);
            handled = 1 + self.drain();
        }

        if let Some(interval) = interval {
            let elapsed = self.last_tick.elapsed();
            if elapsed >= interval {
                self.last_tick = Instant::now();
                self.handler.on_tick(elapsed);
            }
        }
        handled
    }

    /// Run until [`StopHandle::stop`].  Events still queued at that point
    /// are handled before returning.
    pub fn run(&mut self) {
        info!("dispatcher: running");
        self.last_tick = Instant::now();
        while !self.stop.load(Ordering::Acquire) {
            self.run_once();
        }
        let late = self.drain();
        debug!("dispatcher: stopped, {} late event(s)", late);
    }
}
