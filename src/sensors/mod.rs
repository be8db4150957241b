//! Room-sensor measurements and their conversion to published units.
//!
//! A [`SensorMeasurement`] is captured on the sampler's timer thread,
//! moved into a deferred work item, and consumed on the stack thread by
//! [`apply_measurement`].  It is never mutated after capture.
//!
//! ## Conversions
//!
//! | Attribute   | Raw input                         | Published                         |
//! |-------------|-----------------------------------|-----------------------------------|
//! | Temperature | RHT milli-°C, pressure-die °C     | `(avg(raw1, raw2·1000) / 10)` i16 |
//! | Humidity    | milli-%RH                         | `raw / 10` u16 (centi-%)          |
//! | Illuminance | lux                               | `10000·log10(lux) + 1` u16        |
//! | Pressure    | Pa                                | `round(raw / 100)` i16 (hPa)      |
//!
//! Integer divisions truncate toward zero; pressure rounds half away from
//! zero.  Out-of-range floats saturate.

pub mod sampler;

use log::{debug, warn};

use crate::app::ports::{Attribute, AttributeStore, AttributeValue, EndpointId, SensorBus};
use crate::config::EndpointMap;

/// One snapshot of every room sensor, in raw units.  Failed reads hold 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorMeasurement {
    /// Relative humidity, milli-percent.
    pub humidity_milli: u32,
    /// RHT sensor temperature, milli-°C.
    pub temperature_milli: i32,
    /// Pressure-sensor die temperature, °C.
    pub pressure_temperature_c: f32,
    /// Ambient light, lux.
    pub illuminance_lux: f32,
    /// Barometric pressure, Pa.
    pub pressure_pa: f32,
}

impl SensorMeasurement {
    /// Read every sensor.  A failed read leaves its field at 0 and is
    /// logged; the snapshot is always produced.
    pub fn capture(bus: &mut dyn SensorBus) -> Self {
        let mut m = Self::default();
        match bus.read_rht() {
            Ok((rh, t)) => {
                m.humidity_milli = rh;
                m.temperature_milli = t;
            }
            Err(e) => warn!("sensor: RHT read failed ({}), using 0", e),
        }
        match bus.read_lux() {
            Ok(lux) => m.illuminance_lux = lux,
            Err(e) => warn!("sensor: lux read failed ({}), using 0", e),
        }
        match bus.read_pressure() {
            Ok(pa) => m.pressure_pa = pa,
            Err(e) => warn!("sensor: pressure read failed ({}), using 0", e),
        }
        match bus.read_pressure_temperature() {
            Ok(c) => m.pressure_temperature_c = c,
            Err(e) => warn!("sensor: pressure temperature read failed ({}), using 0", e),
        }
        m
    }

    pub fn temperature(&self) -> i16 {
        temperature_centi(self.temperature_milli, self.pressure_temperature_c)
    }

    pub fn humidity(&self) -> u16 {
        humidity_centi(self.humidity_milli)
    }

    pub fn illuminance(&self) -> u16 {
        illuminance_log(self.illuminance_lux)
    }

    pub fn pressure(&self) -> i16 {
        pressure_hpa(self.pressure_pa)
    }
}

/// Average of the two temperature sensors in centi-°C.
pub fn temperature_centi(temperature_milli: i32, pressure_temperature_c: f32) -> i16 {
    let second_milli = (pressure_temperature_c * 1000.0) as i32;
    let average = (temperature_milli.wrapping_add(second_milli) / 2) as i16;
    average / 10
}

/// Milli-percent to centi-percent.
pub fn humidity_centi(humidity_milli: u32) -> u16 {
    (humidity_milli / 10) as u16
}

/// Lux to the logarithmic illuminance scale.  Non-positive lux saturates
/// to 0.
pub fn illuminance_log(lux: f32) -> u16 {
    (10_000.0 * f64::from(lux).log10() + 1.0) as u16
}

/// Pa to hPa, rounded.
pub fn pressure_hpa(pressure_pa: f32) -> i16 {
    (f64::from(pressure_pa) / 100.0).round() as i16
}

/// Publish a measurement.  Stack thread only; consumes the snapshot.
pub fn apply_measurement(store: &mut dyn AttributeStore, endpoints: &EndpointMap, m: SensorMeasurement) {
    let updates: [(EndpointId, Attribute, AttributeValue); 4] = [
        (
            endpoints.temperature,
            Attribute::TemperatureMeasuredValue,
            AttributeValue::I16(m.temperature()),
        ),
        (
            endpoints.humidity,
            Attribute::HumidityMeasuredValue,
            AttributeValue::U16(m.humidity()),
        ),
        (
            endpoints.illuminance,
            Attribute::IlluminanceMeasuredValue,
            AttributeValue::U16(m.illuminance()),
        ),
        (
            endpoints.pressure,
            Attribute::PressureMeasuredValue,
            AttributeValue::I16(m.pressure()),
        ),
    ];
    for (endpoint, attribute, value) in updates {
        match store.set(endpoint, attribute, value) {
            Ok(()) => debug!("sensor: ep{} {:?} = {:?}", endpoint, attribute, value),
            Err(status) => warn!("sensor: publish ep{} {:?}: {}", endpoint, attribute, status),
        }
    }
}
