//! Simulated room-sensor board.
//!
//! Implements [`SensorBus`] with slowly drifting readings for the host
//! binary.  Readings and failures can be injected through a
//! [`SimSensorHandle`] from any thread.

use std::sync::{Arc, Mutex};

use crate::app::ports::SensorBus;
use crate::error::SensorError;

/// Raw readings the simulated bus returns next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimReadings {
    pub humidity_milli: u32,
    pub temperature_milli: i32,
    pub pressure_temperature_c: f32,
    pub lux: f32,
    pub pressure_pa: f32,
    /// Fail every read while set.
    pub faulted: bool,
}

impl Default for SimReadings {
    fn default() -> Self {
        Self {
            humidity_milli: 45_000,
            temperature_milli: 21_500,
            pressure_temperature_c: 21.7,
            lux: 320.0,
            pressure_pa: 101_325.0,
            faulted: false,
        }
    }
}

/// Shared handle for injecting readings.
#[derive(Debug, Clone, Default)]
pub struct SimSensorHandle {
    readings: Arc<Mutex<SimReadings>>,
}

impl SimSensorHandle {
    pub fn set(&self, readings: SimReadings) {
        if let Ok(mut r) = self.readings.lock() {
            *r = readings;
        }
    }

    pub fn set_faulted(&self, faulted: bool) {
        if let Ok(mut r) = self.readings.lock() {
            r.faulted = faulted;
        }
    }
}

pub struct SimSensorBus {
    handle: SimSensorHandle,
    /// Add a small drift each RHT read.
    drift: bool,
    reads: u32,
}

impl SimSensorBus {
    pub fn new(drift: bool) -> (Self, SimSensorHandle) {
        let handle = SimSensorHandle::default();
        (
            Self {
                handle: handle.clone(),
                drift,
                reads: 0,
            },
            handle,
        )
    }

    fn snapshot(&self) -> Result<SimReadings, SensorError> {
        let r = self
            .handle
            .readings
            .lock()
            .map_err(|_| SensorError::BusReadFailed)?;
        if r.faulted {
            return Err(SensorError::BusReadFailed);
        }
        Ok(*r)
    }
}

impl SensorBus for SimSensorBus {
    fn read_rht(&mut self) -> Result<(u32, i32), SensorError> {
        let r = self.snapshot()?;
        self.reads = self.reads.wrapping_add(1);
        let wobble = if self.drift { (self.reads % 7) as i32 * 25 } else { 0 };
        Ok((r.humidity_milli, r.temperature_milli + wobble))
    }

    fn read_lux(&mut self) -> Result<f32, SensorError> {
        Ok(self.snapshot()?.lux)
    }

    fn read_pressure(&mut self) -> Result<f32, SensorError> {
        Ok(self.snapshot()?.pressure_pa)
    }

    fn read_pressure_temperature(&mut self) -> Result<f32, SensorError> {
        Ok(self.snapshot()?.pressure_temperature_c)
    }
}
