//! Behaviour shared by every device app: the status LED, identify, the
//! commissioning function button and OTA bring-up.

use core::time::Duration;
use std::sync::Arc;

use embedded_hal::digital::OutputPin;
use log::{error, info};

use crate::app::ports::{CommissioningPort, toggle_advertising};
use crate::config::AppConfig;
use crate::drivers::led::StatusLed;
use crate::events::{AppEventQueue, AppHandler, ButtonEdge};
use crate::identify::{EffectCommand, IdentifyEffectRunner};

pub struct DeviceBase<P, C> {
    status_led: StatusLed<P>,
    commissioning: C,
    identify: IdentifyEffectRunner,
    identify_blink_rate_ms: u32,
    led_animate: Duration,
    identifying: bool,
}

impl<P: OutputPin, C: CommissioningPort> DeviceBase<P, C> {
    pub fn new(status_led: StatusLed<P>, commissioning: C, queue: Arc<AppEventQueue>, config: &AppConfig) -> Self {
        Self {
            status_led,
            commissioning,
            identify: IdentifyEffectRunner::new(queue),
            identify_blink_rate_ms: config.identify_blink_rate_ms,
            led_animate: Duration::from_millis(u64::from(config.led_animate_ms)),
            identifying: false,
        }
    }

    pub fn status_led(&self) -> &StatusLed<P> {
        &self.status_led
    }

    pub fn commissioning(&self) -> &C {
        &self.commissioning
    }

    pub fn commissioning_mut(&mut self) -> &mut C {
        &mut self.commissioning
    }

    pub fn is_identifying(&self) -> bool {
        self.identifying
    }

    pub fn identify_start(&mut self) {
        self.identifying = true;
        self.status_led.start_blinking(self.identify_blink_rate_ms, None);
        info!("Identify started");
    }

    pub fn identify_stop(&mut self) {
        self.identifying = false;
        self.status_led.stop_blinking();
        info!("Identify stopped");
    }

    pub fn device_operational(&mut self) {
        self.commissioning.init_ota_requestor();
    }

    /// Commissioning button: click toggles advertising, long press
    /// schedules a factory reset.
    pub fn function_button(&mut self, edge: ButtonEdge) {
        match edge {
            ButtonEdge::Clicked => toggle_advertising(&mut self.commissioning),
            ButtonEdge::LongPressed => {
                info!("Factory reset scheduled");
                self.commissioning.schedule_factory_reset();
            }
        }
    }

    /// Handle the identify callbacks.  Returns `false` for handlers the
    /// app must deal with itself.
    pub fn on_callback(&mut self, handler: AppHandler) -> bool {
        match handler {
            AppHandler::IdentifyEffect { effect, variant } => {
                match self.identify.apply(effect, variant) {
                    Ok(EffectCommand::Show(e)) => self.status_led.start_blinking(e.blink_rate_ms(), None),
                    Ok(EffectCommand::Clear) => self.restore_led(),
                    Ok(EffectCommand::Keep | EffectCommand::Ignore) => {}
                    Err(e) => error!("identify: effect {:?} not started: {}", effect, e),
                }
                true
            }
            AppHandler::IdentifyEffectDone { generation } => {
                if let Some(effect) = self.identify.on_done(generation) {
                    info!("identify: {:?} complete", effect);
                    self.restore_led();
                }
                true
            }
            _ => false,
        }
    }

    pub fn led_animate_interval(&self) -> Duration {
        self.led_animate
    }

    pub fn animate(&mut self, elapsed: Duration) {
        self.status_led
            .animate(u32::try_from(elapsed.as_millis()).unwrap_or(u32::MAX));
    }

    // An identify session outlives any effect triggered during it.
    fn restore_led(&mut self) {
        if self.identifying {
            self.status_led.start_blinking(self.identify_blink_rate_ms, None);
        } else {
            self.status_led.stop_blinking();
        }
    }
}
