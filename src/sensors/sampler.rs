//! Periodic sensor sampler.
//!
//! ```text
//!  Stopped ──start(period)──▶ Running ──cancel()──▶ Stopped
//! ```
//!
//! Every period, on the timer thread: capture a [`SensorMeasurement`] and
//! hand it to the deferred channel, which publishes it on the stack
//! thread.  The snapshot is moved into the work item, so it is released
//! whether the item runs or scheduling fails.

use core::time::Duration;

use log::{info, warn};

use crate::app::ports::SensorBus;
use crate::config::EndpointMap;
use crate::deferred::DeferredWorkChannel;
use crate::drivers::timer::PeriodicTimer;
use crate::error::Result;
use crate::sensors::{SensorMeasurement, apply_measurement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Stopped,
    Running,
}

pub struct PeriodicSampler {
    timer: PeriodicTimer,
    channel: DeferredWorkChannel,
    endpoints: EndpointMap,
}

impl PeriodicSampler {
    pub fn new(channel: DeferredWorkChannel, endpoints: EndpointMap) -> Self {
        Self {
            timer: PeriodicTimer::new("sensor"),
            channel,
            endpoints,
        }
    }

    pub fn state(&self) -> SamplerState {
        if self.timer.is_running() {
            SamplerState::Running
        } else {
            SamplerState::Stopped
        }
    }

    /// Begin sampling `bus` every `period`.  The bus moves to the timer
    /// thread and is only touched there.  Restarting replaces the
    /// previous schedule.
    pub fn start<B>(&mut self, period: Duration, mut bus: B) -> Result<()>
    where
        B: SensorBus + Send + 'static,
    {
        let channel = self.channel.clone();
        let endpoints = self.endpoints;
        self.timer.start(period, move || {
            let measurement = SensorMeasurement::capture(&mut bus);
            if let Err(e) = channel.schedule(
                move |store, m: SensorMeasurement| apply_measurement(store, &endpoints, m),
                measurement,
            ) {
                warn!("sampler: measurement dropped: {}", e);
            }
        })?;
        info!("sampler: running every {:?}", period);
        Ok(())
    }

    /// Stop sampling.  Idempotent; a firing already in progress finishes
    /// and still schedules its measurement.
    pub fn cancel(&mut self) {
        if self.state() == SamplerState::Running {
            self.timer.cancel();
            info!("sampler: stopped");
        }
    }
}
