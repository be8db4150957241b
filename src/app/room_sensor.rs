//! Room sensor device app.
//!
//! Sampling runs on the timer thread and publishes through deferred work;
//! the dispatcher side only handles the function button, identify and
//! sampler lifecycle.

use core::time::Duration;

use embedded_hal::digital::OutputPin;

use crate::app::base::DeviceBase;
use crate::app::ports::{CommissioningPort, SensorBus};
use crate::dispatcher::EventHandler;
use crate::drivers::button::ButtonId;
use crate::error::Result;
use crate::events::{ButtonPayload, CallbackPayload};
use crate::sensors::sampler::{PeriodicSampler, SamplerState};

pub struct RoomSensorApp<P, C> {
    base: DeviceBase<P, C>,
    sampler: PeriodicSampler,
}

impl<P: OutputPin, C: CommissioningPort> RoomSensorApp<P, C> {
    pub fn new(base: DeviceBase<P, C>, sampler: PeriodicSampler) -> Self {
        Self { base, sampler }
    }

    pub fn base(&self) -> &DeviceBase<P, C> {
        &self.base
    }

    /// Start periodic sampling of `bus`.
    pub fn start_sampling<B>(&mut self, period: Duration, bus: B) -> Result<()>
    where
        B: SensorBus + Send + 'static,
    {
        self.sampler.start(period, bus)
    }

    pub fn stop_sampling(&mut self) {
        self.sampler.cancel();
    }

    pub fn sampler_state(&self) -> SamplerState {
        self.sampler.state()
    }
}

impl<P: OutputPin, C: CommissioningPort> EventHandler for RoomSensorApp<P, C> {
    fn on_button(&mut self, button: ButtonId, payload: ButtonPayload) {
        if button == ButtonId::Left || button == ButtonId::Generic {
            self.base.function_button(payload.edge);
        }
    }

    fn on_identify_start(&mut self) {
        self.base.identify_start();
    }

    fn on_identify_stop(&mut self) {
        self.base.identify_stop();
    }

    fn on_device_operational(&mut self) {
        self.base.device_operational();
    }

    fn on_callback(&mut self, payload: CallbackPayload) {
        self.base.on_callback(payload.handler);
    }

    fn tick_interval(&self) -> Option<Duration> {
        Some(self.base.led_animate_interval())
    }

    fn on_tick(&mut self, elapsed: Duration) {
        self.base.animate(elapsed);
    }
}
