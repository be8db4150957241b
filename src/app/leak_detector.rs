//! Water-leak detector device app.
//!
//! Right click simulates a leak by toggling the alarm.  The alarm LED is
//! driven from the `AlarmIndicator` callback that the stack-thread update
//! posts back, so it tracks the published visual-alarm bit.

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::error;

use crate::actions::{AlarmState, LeakAlarm};
use crate::app::base::DeviceBase;
use crate::app::ports::CommissioningPort;
use crate::dispatcher::EventHandler;
use crate::drivers::button::ButtonId;
use crate::drivers::led::StatusLed;
use crate::events::{AppHandler, ButtonEdge, ButtonPayload, CallbackPayload};

pub struct LeakDetectorApp<P, C> {
    base: DeviceBase<P, C>,
    alarm_led: StatusLed<P>,
    alarm: LeakAlarm,
}

impl<P: OutputPin, C: CommissioningPort> LeakDetectorApp<P, C> {
    pub fn new(base: DeviceBase<P, C>, alarm_led: StatusLed<P>, alarm: LeakAlarm) -> Self {
        Self {
            base,
            alarm_led,
            alarm,
        }
    }

    pub fn base(&self) -> &DeviceBase<P, C> {
        &self.base
    }

    pub fn alarm_led(&self) -> &StatusLed<P> {
        &self.alarm_led
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.alarm.state()
    }

    /// Leak sensor input.
    pub fn set_leak(&mut self, leaking: bool) {
        let res = if leaking {
            self.alarm.trigger()
        } else {
            self.alarm.untrigger()
        };
        if let Err(e) = res {
            error!("leak: state not published: {}", e);
        }
    }
}

impl<P: OutputPin, C: CommissioningPort> EventHandler for LeakDetectorApp<P, C> {
    fn on_button(&mut self, button: ButtonId, payload: ButtonPayload) {
        match (button, payload.edge) {
            (ButtonId::Left, edge) => self.base.function_button(edge),
            (ButtonId::Right | ButtonId::Generic, ButtonEdge::Clicked) => {
                if let Err(e) = self.alarm.toggle() {
                    error!("leak: state not published: {}", e);
                }
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
        if let AppHandler::AlarmIndicator { on } = payload.handler {
            self.alarm_led.set(on);
        }
    }

    fn tick_interval(&self) -> Option<Duration> {
        Some(self.base.led_animate_interval())
    }

    fn on_tick(&mut self, elapsed: Duration) {
        self.base.animate(elapsed);
    }
}
