//! Mock collaborators for integration tests.
//!
//! Each mock records what the core asked of it so tests can assert on the
//! full call history without a protocol stack or real sensors.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use appcore::actions::{Action, ActionListener, ActuatorDriver, Actor, CompletionToken};
use appcore::app::ports::{CommissioningError, CommissioningPort, SensorBus};
use appcore::error::SensorError;

// ── Polling helper ────────────────────────────────────────────

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

// ── MockSensorBus ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockReadings {
    pub humidity_milli: u32,
    pub temperature_milli: i32,
    pub pressure_temperature_c: f32,
    pub lux: f32,
    pub pressure_pa: f32,
    pub fail_rht: bool,
    pub fail_lux: bool,
}

impl Default for MockReadings {
    fn default() -> Self {
        Self {
            humidity_milli: 40_000,
            temperature_milli: 21_000,
            pressure_temperature_c: 21.0,
            lux: 1_000.0,
            pressure_pa: 101_325.0,
            fail_rht: false,
            fail_lux: false,
        }
    }
}

/// Sensor bus returning whatever the test last set.  Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockSensorBus {
    readings: Arc<Mutex<MockReadings>>,
    captures: Arc<Mutex<u32>>,
}

#[allow(dead_code)]
impl MockSensorBus {
    pub fn new(readings: MockReadings) -> Self {
        Self {
            readings: Arc::new(Mutex::new(readings)),
            captures: Arc::default(),
        }
    }

    pub fn set(&self, readings: MockReadings) {
        *self.readings.lock().unwrap() = readings;
    }

    /// Completed RHT reads, i.e. captures attempted.
    pub fn captures(&self) -> u32 {
        *self.captures.lock().unwrap()
    }

    fn current(&self) -> MockReadings {
        *self.readings.lock().unwrap()
    }
}

impl SensorBus for MockSensorBus {
    fn read_rht(&mut self) -> Result<(u32, i32), SensorError> {
        *self.captures.lock().unwrap() += 1;
        let r = self.current();
        if r.fail_rht {
            return Err(SensorError::BusReadFailed);
        }
        Ok((r.humidity_milli, r.temperature_milli))
    }

    fn read_lux(&mut self) -> Result<f32, SensorError> {
        let r = self.current();
        if r.fail_lux {
            return Err(SensorError::NotPresent);
        }
        Ok(r.lux)
    }

    fn read_pressure(&mut self) -> Result<f32, SensorError> {
        Ok(self.current().pressure_pa)
    }

    fn read_pressure_temperature(&mut self) -> Result<f32, SensorError> {
        Ok(self.current().pressure_temperature_c)
    }
}

// ── MockCommissioning ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissioningCall {
    OpenWindow,
    SetAdvertising(bool),
    FactoryReset,
    OtaRequestor,
}

#[derive(Debug, Default)]
pub struct MockCommissioning {
    pub calls: Vec<CommissioningCall>,
    pub advertising: bool,
}

#[allow(dead_code)]
impl MockCommissioning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, call: CommissioningCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl CommissioningPort for MockCommissioning {
    fn is_advertising(&self) -> bool {
        self.advertising
    }

    fn open_commissioning_window(&mut self) -> Result<(), CommissioningError> {
        self.calls.push(CommissioningCall::OpenWindow);
        self.advertising = true;
        Ok(())
    }

    fn set_advertising(&mut self, enabled: bool) {
        self.calls.push(CommissioningCall::SetAdvertising(enabled));
        self.advertising = enabled;
    }

    fn schedule_factory_reset(&mut self) {
        self.calls.push(CommissioningCall::FactoryReset);
    }

    fn init_ota_requestor(&mut self) {
        self.calls.push(CommissioningCall::OtaRequestor);
    }
}

// ── Manual actuator ───────────────────────────────────────────

/// Holds completion tokens until the test completes them.
#[derive(Default)]
pub struct ManualActuator {
    pub pending: Vec<CompletionToken>,
}

#[allow(dead_code)]
impl ManualActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete the oldest outstanding action.
    pub fn finish_next(&mut self) -> Option<Action> {
        if self.pending.is_empty() {
            return None;
        }
        let token = self.pending.remove(0);
        let action = token.action();
        token.complete().ok()?;
        Some(action)
    }
}

impl ActuatorDriver for ManualActuator {
    fn actuate(&mut self, _action: Action, done: CompletionToken) {
        self.pending.push(done);
    }
}

// ── Recording listener ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerCall {
    Initiated(Action, Actor),
    Completed(Action, Actor),
}

#[derive(Default)]
pub struct RecordingListener {
    pub calls: Mutex<Vec<ListenerCall>>,
}

#[allow(dead_code)]
impl RecordingListener {
    pub fn calls(&self) -> Vec<ListenerCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ActionListener for RecordingListener {
    fn on_initiated(&self, action: Action, actor: Actor) {
        self.calls.lock().unwrap().push(ListenerCall::Initiated(action, actor));
    }

    fn on_completed(&self, action: Action, actor: Actor) {
        self.calls.lock().unwrap().push(ListenerCall::Completed(action, actor));
    }
}
