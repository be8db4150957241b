//! Flow sensor device app.
//!
//! The buttons step the published flow value.  The read-modify-write
//! runs on the stack thread so it sees the latest stored value.
//!
//! | Input              | Reaction                                    |
//! |--------------------|---------------------------------------------|
//! | Left click         | Flow down one step, floor 0                 |
//! | Right click        | Flow up one step, ceiling 65534             |
//! | Left long press    | Factory reset                               |
//! | Right long press   | Advertising toggle                          |
//!
//! A null flow value is first set to the midpoint, 0x7FFF.

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::base::DeviceBase;
use crate::app::ports::{
    Attribute, AttributeStore, AttributeValue, CommissioningPort, EndpointId, toggle_advertising,
};
use crate::deferred::DeferredWorkChannel;
use crate::dispatcher::EventHandler;
use crate::drivers::button::ButtonId;
use crate::events::{ButtonEdge, ButtonPayload, CallbackPayload};

/// Largest valid measured flow.
pub const FLOW_MAX: u16 = 65_534;
/// Value a null flow starts from.
pub const FLOW_MIDPOINT: u16 = 0xFFFF / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    Down,
    Up,
}

/// Next flow value after one step from `current`.
pub fn step_flow(current: Option<u16>, step: u16, direction: FlowStep) -> u16 {
    let Some(v) = current else {
        return FLOW_MIDPOINT;
    };
    match direction {
        FlowStep::Down => v.saturating_sub(step),
        FlowStep::Up => {
            if v > FLOW_MAX.saturating_sub(step) {
                FLOW_MAX
            } else {
                v + step
            }
        }
    }
}

pub struct FlowSensorApp<P, C> {
    base: DeviceBase<P, C>,
    channel: DeferredWorkChannel,
    endpoint: EndpointId,
    step: u16,
}

impl<P: OutputPin, C: CommissioningPort> FlowSensorApp<P, C> {
    pub fn new(base: DeviceBase<P, C>, channel: DeferredWorkChannel, endpoint: EndpointId, step: u16) -> Self {
        Self {
            base,
            channel,
            endpoint,
            step,
        }
    }

    pub fn base(&self) -> &DeviceBase<P, C> {
        &self.base
    }

    fn schedule_step(&self, direction: FlowStep) {
        let _ = self.channel.schedule(
            apply_flow_step,
            FlowStepRequest {
                endpoint: self.endpoint,
                step: self.step,
                direction,
            },
        );
    }
}

struct FlowStepRequest {
    endpoint: EndpointId,
    step: u16,
    direction: FlowStep,
}

fn apply_flow_step(store: &mut dyn AttributeStore, req: FlowStepRequest) {
    let current = match store.get(req.endpoint, Attribute::FlowMeasuredValue) {
        Ok(AttributeValue::U16(v)) => Some(v),
        Ok(_) => None,
        Err(status) => {
            warn!("flow: read ep{}: {}", req.endpoint, status);
            return;
        }
    };
    let next = step_flow(current, req.step, req.direction);
    match current {
        None => info!("flow: setting initial value {}", next),
        Some(v) => info!("flow: {} -> {}", v, next),
    }
    if let Err(status) = store.set(req.endpoint, Attribute::FlowMeasuredValue, AttributeValue::U16(next)) {
        warn!("flow: publish ep{}: {}", req.endpoint, status);
    }
}

impl<P: OutputPin, C: CommissioningPort> EventHandler for FlowSensorApp<P, C> {
    fn on_button(&mut self, button: ButtonId, payload: ButtonPayload) {
        match (button, payload.edge) {
            (ButtonId::Left, ButtonEdge::Clicked) => self.schedule_step(FlowStep::Down),
            (ButtonId::Left, ButtonEdge::LongPressed) => self.base.function_button(ButtonEdge::LongPressed),
            (ButtonId::Right, ButtonEdge::Clicked) => self.schedule_step(FlowStep::Up),
            (ButtonId::Right, ButtonEdge::LongPressed) => {
                toggle_advertising(self.base.commissioning_mut());
            }
            (ButtonId::Generic, edge) => self.base.function_button(edge),
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
