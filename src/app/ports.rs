//! Port traits: the boundary between the core and its external collaborators.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Dispatcher / deferred work (core)
//! ```
//!
//! The protocol stack, its attribute storage, the sensor bus and the
//! commissioning machinery all live outside this crate.  Each is reached
//! through one of the traits below so the core can be driven by mocks on
//! the host.
//!
//! ## Threading rules
//!
//! - [`AttributeStore`] is only ever handed out on the authoritative
//!   (stack) thread, inside a deferred work item.
//! - [`SensorBus`] is confined to the sampler's timer thread.
//! - [`CommissioningPort`] is called from the dispatcher thread.

use crate::error::{AttributeStatus, SensorError};

// ───────────────────────────────────────────────────────────────
// Attribute storage (stack-owned published state)
// ───────────────────────────────────────────────────────────────

/// Endpoint number within the device's data model.
pub type EndpointId = u16;

/// Alarm-mode bits carried by `AlarmsEnabled` / `AlarmsActive`.
pub const ALARM_VISUAL: u8 = 0b01;
pub const ALARM_AUDIBLE: u8 = 0b10;

/// The published attributes the device applications touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    OnOff,
    BooleanStateValue,
    AlarmsEnabled,
    AlarmsActive,
    TemperatureMeasuredValue,
    HumidityMeasuredValue,
    IlluminanceMeasuredValue,
    PressureMeasuredValue,
    FlowMeasuredValue,
}

/// A typed attribute value.  `Null` marks a nullable attribute with no
/// current reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    I16(i16),
    Null,
}

impl AttributeValue {
    /// Whether `other` may overwrite a slot currently holding `self`.
    pub fn accepts(&self, other: &AttributeValue) -> bool {
        matches!(self, Self::Null)
            || matches!(other, Self::Null)
            || core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Self::U16(v) => Some(*v),
            _ => None,
        }
    }
}

/// Read/write access to the stack's attribute storage.
///
/// Must only be used from the authoritative thread.  Errors are
/// non-fatal status codes; callers log them and carry on.
pub trait AttributeStore {
    fn get(&self, endpoint: EndpointId, attribute: Attribute)
    -> Result<AttributeValue, AttributeStatus>;

    fn set(
        &mut self,
        endpoint: EndpointId,
        attribute: Attribute,
        value: AttributeValue,
    ) -> Result<(), AttributeStatus>;
}

// ───────────────────────────────────────────────────────────────
// Sensor bus (driven adapter: hardware → sampler)
// ───────────────────────────────────────────────────────────────

/// Raw getters for the room-sensor board.  All synchronous and bounded.
pub trait SensorBus {
    /// Relative humidity (milli-percent) and temperature (milli-°C).
    fn read_rht(&mut self) -> Result<(u32, i32), SensorError>;

    /// Ambient light (lux).
    fn read_lux(&mut self) -> Result<f32, SensorError>;

    /// Barometric pressure (Pa).
    fn read_pressure(&mut self) -> Result<f32, SensorError>;

    /// Die temperature of the pressure sensor (°C).
    fn read_pressure_temperature(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Commissioning (driven adapter: core → protocol stack)
// ───────────────────────────────────────────────────────────────

/// The few commissioning/device-layer operations button handlers need.
pub trait CommissioningPort {
    /// Whether BLE commissioning advertisements are currently on.
    fn is_advertising(&self) -> bool;

    /// Open the basic commissioning window (starts advertising).
    fn open_commissioning_window(&mut self) -> Result<(), CommissioningError>;

    /// Turn advertising on or off.
    fn set_advertising(&mut self, enabled: bool);

    /// Erase fabrics and reboot once the stack is idle.
    fn schedule_factory_reset(&mut self);

    /// Bring up the OTA requestor once the device is operational.
    fn init_ota_requestor(&mut self);
}

/// Errors from [`CommissioningPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommissioningError {
    /// A commissioning window is already open or the fabric table is full.
    WindowUnavailable,
    /// The stack is not initialised.
    StackDown,
}

impl core::fmt::Display for CommissioningError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::WindowUnavailable => write!(f, "commissioning window unavailable"),
            Self::StackDown => write!(f, "stack not running"),
        }
    }
}

/// Commissioning-button behaviour: stop advertising if on, otherwise
/// open the commissioning window.
pub fn toggle_advertising(port: &mut impl CommissioningPort) {
    if port.is_advertising() {
        port.set_advertising(false);
        log::info!("Disabled BLE advertisements");
    } else {
        match port.open_commissioning_window() {
            Ok(()) => log::info!("Enabled BLE advertisements"),
            Err(e) => log::warn!("open_commissioning_window failed: {}", e),
        }
    }
}
