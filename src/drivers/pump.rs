//! Simulated pump actuator.
//!
//! Models the motor spin-up/spin-down latency of a real pump: each
//! accepted action completes `actuation` later on the timer thread,
//! which is where a vendor driver's completion callback would run.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use log::{error, warn};

use crate::actions::{Action, ActuatorDriver, CompletionToken};
use crate::drivers::timer::OneShotTimer;

pub struct SimulatedPump {
    actuation: Duration,
    timer: OneShotTimer,
    running: Arc<AtomicBool>,
}

impl SimulatedPump {
    pub fn new(actuation: Duration) -> Self {
        Self {
            actuation,
            timer: OneShotTimer::new("pump"),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Physical motor state; changes only when an action completes.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// `true` while an actuation is in progress.
    pub fn is_busy(&self) -> bool {
        self.timer.is_pending()
    }
}

impl ActuatorDriver for SimulatedPump {
    fn actuate(&mut self, action: Action, done: CompletionToken) {
        let running = self.running.clone();
        let started = self.timer.start(self.actuation, move || {
            running.store(action == Action::Start, Ordering::Release);
            if let Err(e) = done.complete() {
                warn!("pump: {:?} completion rejected: {}", action, e);
            }
        });
        if let Err(e) = started {
            // Token dropped with the closure; the machine stays initiating.
            error!("pump: cannot start actuation timer: {}", e);
        }
    }
}
