//! Deferred cross-thread execution on the authoritative (stack) thread.
//!
//! Published device state is owned by the protocol stack's own run loop.
//! Any other thread that needs to change it packages the change as a
//! [`WorkItem`] and hands it over through a [`DeferredWorkChannel`]:
//!
//! ```text
//! ┌──────────────┐ schedule(fn, ctx) ┌────────────────┐ drain ┌──────────────┐
//! │ Timer thread │──────────────────▶│                │──────▶│ Stack thread │
//! │ Dispatcher   │──────────────────▶│ StackWorkQueue │       │ fn(store,ctx)│
//! │ Actuator cb  │──────────────────▶│   (bounded)    │       │              │
//! └──────────────┘                   └────────────────┘       └──────────────┘
//! ```
//!
//! The context value is moved into the item; it is released when the item
//! runs, or immediately if scheduling fails.  No path leaks it.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::future::block_on;
use log::error;

use crate::app::ports::AttributeStore;
use crate::error::ScheduleError;

/// Depth of the stack's work queue.
pub const STACK_WORK_QUEUE_SIZE: usize = 16;

/// A unit of work executed exactly once on the authoritative thread.
pub type WorkItem = Box<dyn FnOnce(&mut dyn AttributeStore) + Send + 'static>;

/// The stack's work-scheduling primitive.
pub trait WorkScheduler: Send + Sync {
    /// Queue `item` for the authoritative thread.  Never blocks.
    fn schedule_work(&self, item: WorkItem) -> Result<(), ScheduleError>;
}

// ───────────────────────────────────────────────────────────────
// Stack work queue
// ───────────────────────────────────────────────────────────────

/// Bounded FIFO of work items consumed by the authoritative thread.
///
/// Rejects work with [`ScheduleError::NotInitialized`] until [`start`]
/// has been called and after [`stop`].
///
/// [`start`]: StackWorkQueue::start
/// [`stop`]: StackWorkQueue::stop
pub struct StackWorkQueue<const N: usize> {
    channel: Channel<CriticalSectionRawMutex, WorkItem, N>,
    running: AtomicBool,
}

impl<const N: usize> Default for StackWorkQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> StackWorkQueue<N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Accept work from now on.
    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    /// Stop accepting work.  Items already queued remain drainable.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Items waiting to run.
    pub fn pending(&self) -> usize {
        self.channel.len()
    }

    /// Run every queued item in FIFO order.  Returns how many ran.
    /// Authoritative thread only.
    pub fn drain(&self, store: &mut dyn AttributeStore) -> usize {
        let mut ran = 0;
        while let Ok(item) = self.channel.try_receive() {
            item(store);
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` (forever if `None`) for one item and run it.
    /// Returns `true` if an item ran.
    pub fn run_next(&self, store: &mut dyn AttributeStore, timeout: Option<Duration>) -> bool {
        let item = match timeout {
            None => Some(block_on(self.channel.receive())),
            Some(d) => {
                let wait = embassy_time::Duration::from_micros(
                    u64::try_from(d.as_micros()).unwrap_or(u64::MAX),
                );
                block_on(embassy_time::with_timeout(wait, self.channel.receive())).ok()
            }
        };
        match item {
            Some(item) => {
                item(store);
                true
            }
            None => false,
        }
    }
}

impl<const N: usize> WorkScheduler for StackWorkQueue<N> {
    fn schedule_work(&self, item: WorkItem) -> Result<(), ScheduleError> {
        if !self.is_running() {
            return Err(ScheduleError::NotInitialized);
        }
        self.channel
            .try_send(item)
            .map_err(|_| ScheduleError::QueueFull)
    }
}

// ───────────────────────────────────────────────────────────────
// Deferred work channel
// ───────────────────────────────────────────────────────────────

/// The only sanctioned way for a non-stack thread to touch published state.
///
/// Cheap to clone; every clone feeds the same authoritative queue.
#[derive(Clone)]
pub struct DeferredWorkChannel {
    scheduler: Arc<dyn WorkScheduler>,
}

impl DeferredWorkChannel {
    pub fn new(scheduler: Arc<dyn WorkScheduler>) -> Self {
        Self { scheduler }
    }

    /// Run `handler(store, context)` once, later, on the authoritative
    /// thread.  Items from one producer run in submission order.
    ///
    /// Ownership of `context` moves into the scheduled item.  On failure
    /// the item, and with it `context`, is dropped before returning.
    pub fn schedule<C, F>(&self, handler: F, context: C) -> Result<(), ScheduleError>
    where
        C: Send + 'static,
        F: FnOnce(&mut dyn AttributeStore, C) + Send + 'static,
    {
        let item: WorkItem = Box::new(move |store| handler(store, context));
        self.scheduler.schedule_work(item).inspect_err(|e| {
            error!("deferred: schedule failed: {}", e);
        })
    }
}
