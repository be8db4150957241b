//! Unified error types for the application core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! dispatcher's and the binary's error handling uniform. All variants are
//! `Copy` so they can cross thread and ISR boundaries without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A queue, task, or timer could not be created at startup.
    Init(&'static str),
    /// Deferred work could not be handed to the authoritative thread.
    Schedule(ScheduleError),
    /// An actuator action was rejected or arrived out of order.
    Action(ActionError),
    /// The attribute store refused a read or write.
    Attribute(AttributeStatus),
    /// A sensor bus read failed.
    Sensor(SensorError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::Action(e) => write!(f, "action: {e}"),
            Self::Attribute(e) => write!(f, "attribute: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Deferred scheduling errors
// ---------------------------------------------------------------------------

/// Why a work item could not be queued for the authoritative thread.
///
/// Unlike a dropped button edge, a lost state update corrupts observable
/// device state, so this is always surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// The authoritative thread's queue is full.
    QueueFull,
    /// The authoritative thread has not started (or has shut down).
    NotInitialized,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "work queue full"),
            Self::NotInitialized => write!(f, "work queue not initialised"),
        }
    }
}

impl From<ScheduleError> for Error {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator action errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    /// The actuator is mid-transition; concurrent actions are not queued.
    Busy,
    /// The actuator is already in the requested end state.
    AlreadyInState,
    /// A completion arrived with no matching initiation.
    NoPendingInitiation,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "actuator busy"),
            Self::AlreadyInState => write!(f, "actuator already in requested state"),
            Self::NoPendingInitiation => write!(f, "completion without initiation"),
        }
    }
}

impl From<ActionError> for Error {
    fn from(e: ActionError) -> Self {
        Self::Action(e)
    }
}

// ---------------------------------------------------------------------------
// Attribute store status codes
// ---------------------------------------------------------------------------

/// Non-fatal status codes reported by the attribute store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeStatus {
    /// The endpoint does not host this attribute.
    UnsupportedAttribute,
    /// The value's type does not match the attribute's type.
    TypeMismatch,
    /// Storage is exhausted or otherwise failed.
    Failure,
}

impl fmt::Display for AttributeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedAttribute => write!(f, "unsupported attribute"),
            Self::TypeMismatch => write!(f, "type mismatch"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

impl From<AttributeStatus> for Error {
    fn from(e: AttributeStatus) -> Self {
        Self::Attribute(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The bus transaction failed or timed out.
    BusReadFailed,
    /// The sensor did not answer at its address.
    NotPresent,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusReadFailed => write!(f, "bus read failed"),
            Self::NotPresent => write!(f, "sensor not present"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
