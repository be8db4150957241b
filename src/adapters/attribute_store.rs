//! In-memory attribute storage.
//!
//! Implements [`AttributeStore`] over a fixed-capacity map for the host
//! stack simulation and for tests.  On a real device the protocol stack
//! owns the storage and this adapter is not used.

use heapless::FnvIndexMap;
use log::debug;

use crate::app::ports::{
    ALARM_AUDIBLE, ALARM_VISUAL, Attribute, AttributeStore, AttributeValue, EndpointId,
};
use crate::config::EndpointMap;
use crate::error::AttributeStatus;

/// Maximum number of (endpoint, attribute) slots.  Power of two.
const MAX_ATTRIBUTES: usize = 32;

pub struct MemoryAttributeStore {
    slots: FnvIndexMap<(EndpointId, Attribute), AttributeValue, MAX_ATTRIBUTES>,
    writes: u32,
}

impl Default for MemoryAttributeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAttributeStore {
    /// An empty store; every access fails until attributes are declared.
    pub fn new() -> Self {
        Self {
            slots: FnvIndexMap::new(),
            writes: 0,
        }
    }

    /// A store pre-populated with every attribute the device apps use.
    pub fn with_endpoints(map: &EndpointMap) -> Self {
        let mut store = Self::new();
        store.declare(map.on_off, Attribute::OnOff, AttributeValue::Bool(false));
        store.declare(map.leak, Attribute::BooleanStateValue, AttributeValue::Bool(false));
        store.declare(
            map.leak,
            Attribute::AlarmsEnabled,
            AttributeValue::U8(ALARM_VISUAL | ALARM_AUDIBLE),
        );
        store.declare(map.leak, Attribute::AlarmsActive, AttributeValue::U8(0));
        store.declare(map.temperature, Attribute::TemperatureMeasuredValue, AttributeValue::Null);
        store.declare(map.humidity, Attribute::HumidityMeasuredValue, AttributeValue::Null);
        store.declare(map.illuminance, Attribute::IlluminanceMeasuredValue, AttributeValue::Null);
        store.declare(map.pressure, Attribute::PressureMeasuredValue, AttributeValue::Null);
        store.declare(map.flow, Attribute::FlowMeasuredValue, AttributeValue::Null);
        store
    }

    /// Create (or reset) a slot.  Returns `false` if the store is full.
    pub fn declare(&mut self, endpoint: EndpointId, attribute: Attribute, initial: AttributeValue) -> bool {
        self.slots.insert((endpoint, attribute), initial).is_ok()
    }

    /// Successful writes since construction.
    pub fn write_count(&self) -> u32 {
        self.writes
    }
}

impl AttributeStore for MemoryAttributeStore {
    fn get(&self, endpoint: EndpointId, attribute: Attribute) -> Result<AttributeValue, AttributeStatus> {
        self.slots
            .get(&(endpoint, attribute))
            .copied()
            .ok_or(AttributeStatus::UnsupportedAttribute)
    }

    fn set(
        &mut self,
        endpoint: EndpointId,
        attribute: Attribute,
        value: AttributeValue,
    ) -> Result<(), AttributeStatus> {
        let slot = self
            .slots
            .get_mut(&(endpoint, attribute))
            .ok_or(AttributeStatus::UnsupportedAttribute)?;
        if !slot.accepts(&value) {
            return Err(AttributeStatus::TypeMismatch);
        }
        *slot = value;
        self.writes += 1;
        debug!("attr: ep{} {:?} = {:?}", endpoint, attribute, value);
        Ok(())
    }
}
