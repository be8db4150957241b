//! Software timer service.
//!
//! Each timer runs its callback on a dedicated timer thread, never on the
//! dispatcher or the stack thread, mirroring an RTOS timer-service task.
//! Callbacks must stay short: push an event, schedule deferred work, or
//! read a sensor.
//!
//! Cancellation is cooperative.  `cancel()` stops further firings and
//! waits for an in-flight callback to return; it never interrupts one.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{debug, warn};

use crate::error::{Error, Result};

struct Running {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Running {
    fn spawn<F>(name: &'static str, period: Duration, repeat: bool, mut callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let mut deadline = Instant::now() + period;
                loop {
                    // Sleep until the deadline or until cancelled.
                    loop {
                        if flag.load(Ordering::Acquire) {
                            return;
                        }
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::park_timeout(deadline - now);
                    }
                    callback();
                    if !repeat {
                        return;
                    }
                    deadline = (deadline + period).max(Instant::now());
                }
            })
            .map_err(|_| Error::Init("timer thread"))?;
        Ok(Self { cancel, handle })
    }

    fn stop(self, name: &'static str) {
        self.cancel.store(true, Ordering::Release);
        // A callback that cancels its own timer must not join itself.
        if self.handle.thread().id() == thread::current().id() {
            return;
        }
        self.handle.thread().unpark();
        if self.handle.join().is_err() {
            warn!("timer '{}': callback panicked", name);
        }
    }

    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ── Periodic ──────────────────────────────────────────────────

/// A reloading timer: fires every `period` until cancelled.
pub struct PeriodicTimer {
    name: &'static str,
    running: Option<Running>,
}

impl PeriodicTimer {
    pub const fn new(name: &'static str) -> Self {
        Self { name, running: None }
    }

    /// Start (or restart) the timer.  The first firing is one period out.
    pub fn start<F>(&mut self, period: Duration, callback: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.cancel();
        self.running = Some(Running::spawn(self.name, period, true, callback)?);
        debug!("timer '{}': started, period {:?}", self.name, period);
        Ok(())
    }

    /// Stop firing.  No-op if already stopped.
    pub fn cancel(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop(self.name);
            debug!("timer '{}': cancelled", self.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ── One-shot ──────────────────────────────────────────────────

/// Fires once after a delay.  Restarting replaces the pending firing.
pub struct OneShotTimer {
    name: &'static str,
    running: Option<Running>,
}

impl OneShotTimer {
    pub const fn new(name: &'static str) -> Self {
        Self { name, running: None }
    }

    pub fn start<F>(&mut self, delay: Duration, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        let mut callback = Some(callback);
        self.running = Some(Running::spawn(self.name, delay, false, move || {
            if let Some(cb) = callback.take() {
                cb();
            }
        })?);
        Ok(())
    }

    /// Drop the pending firing, if any.
    pub fn cancel(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop(self.name);
        }
    }

    /// `true` while a firing is still pending.
    pub fn is_pending(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.is_finished())
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
