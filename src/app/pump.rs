//! Pump device app.
//!
//! | Input                    | Reaction                                   |
//! |--------------------------|--------------------------------------------|
//! | Left click / long press  | Advertising toggle / factory reset         |
//! | Right click              | Toggle pump (`Actor::Button`)              |
//! | `ActuatorCommand`        | Start/stop pump for the given actor        |
//! | `ActionCompleted`        | Pump LED follows the new state             |
//!
//! While an action is in flight the pump LED blinks fast.  The `OnOff`
//! attribute is written by [`OnOffPublisher`](crate::actions::OnOffPublisher)
//! only once the driver reports completion.

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::info;

use crate::actions::{Action, ActionStateMachine, ActuatorDriver, ActuatorState, Actor};
use crate::app::base::DeviceBase;
use crate::app::ports::CommissioningPort;
use crate::dispatcher::EventHandler;
use crate::drivers::button::ButtonId;
use crate::drivers::led::StatusLed;
use crate::events::{AppHandler, ButtonEdge, ButtonPayload, CallbackPayload};

/// Pump LED toggle period while an action is in flight.
const TRANSITION_BLINK_MS: u32 = 50;

pub struct PumpApp<P, C, D> {
    base: DeviceBase<P, C>,
    pump_led: StatusLed<P>,
    machine: ActionStateMachine,
    driver: D,
}

impl<P, C, D> PumpApp<P, C, D>
where
    P: OutputPin,
    C: CommissioningPort,
    D: ActuatorDriver,
{
    pub fn new(base: DeviceBase<P, C>, pump_led: StatusLed<P>, machine: ActionStateMachine, driver: D) -> Self {
        Self {
            base,
            pump_led,
            machine,
            driver,
        }
    }

    pub fn base(&self) -> &DeviceBase<P, C> {
        &self.base
    }

    pub fn pump_led(&self) -> &StatusLed<P> {
        &self.pump_led
    }

    pub fn state(&self) -> ActuatorState {
        self.machine.state()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn request(&mut self, action: Option<Action>, actor: Actor) {
        let result = match action {
            Some(a) => self.machine.request_action(a, actor, &mut self.driver).map(|()| a),
            None => self.machine.toggle(actor, &mut self.driver),
        };
        match result {
            Ok(a) => {
                info!("pump: {:?} requested", a);
                self.pump_led.start_blinking(TRANSITION_BLINK_MS, None);
            }
            Err(e) => info!("pump: request ignored: {}", e),
        }
    }
}

impl<P, C, D> EventHandler for PumpApp<P, C, D>
where
    P: OutputPin,
    C: CommissioningPort,
    D: ActuatorDriver,
{
    fn on_button(&mut self, button: ButtonId, payload: ButtonPayload) {
        match (button, payload.edge) {
            (ButtonId::Left, edge) => self.base.function_button(edge),
            (ButtonId::Right | ButtonId::Generic, ButtonEdge::Clicked) => {
                self.request(None, Actor::Button);
            }
            _ => {}
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
        if self.base.on_callback(payload.handler) {
            return;
        }
        match payload.handler {
            AppHandler::ActuatorCommand { action, actor } => self.request(Some(action), actor),
            AppHandler::ActionCompleted(action) => {
                self.pump_led.set(action == Action::Start);
                info!("pump: {}", if action == Action::Start { "started" } else { "stopped" });
            }
            _ => {}
        }
    }

    fn tick_interval(&self) -> Option<Duration> {
        Some(self.base.led_animate_interval())
    }

    fn on_tick(&mut self, elapsed: Duration) {
        self.base.animate(elapsed);
        self.pump_led
            .animate(u32::try_from(elapsed.as_millis()).unwrap_or(u32::MAX));
    }
}
