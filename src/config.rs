//! Application configuration parameters
//!
//! All tunable parameters for the device applications. Defaults match the
//! reference boards; the host binary can override them from a JSON file.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Endpoint numbers that host each published attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointMap {
    pub temperature: u16,
    pub humidity: u16,
    pub illuminance: u16,
    pub pressure: u16,
    pub on_off: u16,
    pub leak: u16,
    pub flow: u16,
}

impl Default for EndpointMap {
    fn default() -> Self {
        Self {
            temperature: 1,
            humidity: 2,
            illuminance: 3,
            pressure: 4,
            on_off: 1,
            leak: 1,
            flow: 1,
        }
    }
}

/// Core application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    // --- Sampling ---
    /// Periodic sensor sampling interval (milliseconds)
    pub sample_period_ms: u32,

    // --- Buttons ---
    /// Hold duration that turns a press into a long press (milliseconds)
    pub long_press_ms: u32,

    // --- LEDs ---
    /// Identify LED blink rate (milliseconds per phase)
    pub identify_blink_rate_ms: u32,
    /// LED animation tick while any LED is blinking (milliseconds)
    pub led_animate_ms: u32,

    // --- Actuators ---
    /// Simulated pump actuation latency (milliseconds)
    pub pump_actuation_ms: u32,

    // --- Flow sensor ---
    /// Step applied to the measured flow value per button click
    pub flow_step: u16,

    /// Endpoint layout
    pub endpoints: EndpointMap,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 10_000, // 0.1 Hz
            long_press_ms: 5_000,
            identify_blink_rate_ms: 500,
            led_animate_ms: 50,
            pump_actuation_ms: 1_000,
            flow_step: 100,
            endpoints: EndpointMap::default(),
        }
    }
}

impl AppConfig {
    /// Reject values that would stall timers or spin the dispatcher.
    pub fn validate(&self) -> Result<()> {
        if self.sample_period_ms == 0 {
            return Err(Error::Config("sample_period_ms must be non-zero"));
        }
        if self.long_press_ms == 0 {
            return Err(Error::Config("long_press_ms must be non-zero"));
        }
        if self.identify_blink_rate_ms == 0 || self.led_animate_ms == 0 {
            return Err(Error::Config("LED timings must be non-zero"));
        }
        if self.flow_step == 0 {
            return Err(Error::Config("flow_step must be non-zero"));
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|_| Error::Config("serialisation failed"))
    }
}
