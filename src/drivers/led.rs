//! Single-colour status LED with blink patterns.
//!
//! Generic over any `embedded_hal::digital::OutputPin`, so the same
//! driver runs on an ESP-IDF `PinDriver` and on the host [`SimPin`].
//!
//! ## Patterns
//!
//! | Pattern   | Started by         | Ends                          |
//! |-----------|--------------------|-------------------------------|
//! | Steady    | `set_on`/`set_off` | never                         |
//! | Flash     | `blink`            | after `on_ms`, LED off        |
//! | Blinking  | `start_blinking`   | after `count` flashes, or never |
//!
//! Time advances only through [`StatusLed::animate`], called by the
//! owning thread with the milliseconds elapsed since the last call.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Steady,
    Flash {
        remaining_ms: u32,
    },
    Blinking {
        rate_ms: u32,
        elapsed_ms: u32,
        /// Pin toggles left before stopping; `None` blinks forever.
        toggles_left: Option<u32>,
    },
}

pub struct StatusLed<P> {
    pin: P,
    on: bool,
    pattern: Pattern,
}

impl<P: OutputPin> StatusLed<P> {
    /// Take the pin and drive it low.
    pub fn new(pin: P) -> Self {
        let mut led = Self {
            pin,
            on: true,
            pattern: Pattern::Steady,
        };
        led.drive(false);
        led
    }

    pub fn set_on(&mut self) {
        self.set(true);
    }

    pub fn set_off(&mut self) {
        self.set(false);
    }

    /// Steady on or off; cancels any pattern.
    pub fn set(&mut self, on: bool) {
        self.pattern = Pattern::Steady;
        self.drive(on);
    }

    /// Single flash of `on_ms`.
    pub fn blink(&mut self, on_ms: u32) {
        self.drive(true);
        self.pattern = Pattern::Flash { remaining_ms: on_ms };
    }

    /// Toggle every `rate_ms`.  `count` on-flashes, or forever if `None`.
    pub fn start_blinking(&mut self, rate_ms: u32, count: Option<u32>) {
        if count == Some(0) {
            self.set_off();
            return;
        }
        self.drive(true);
        self.pattern = Pattern::Blinking {
            rate_ms: rate_ms.max(1),
            elapsed_ms: 0,
            toggles_left: count.map(|n| n.saturating_mul(2) - 1),
        };
    }

    /// Stop any pattern and turn off.
    pub fn stop_blinking(&mut self) {
        self.set_off();
    }

    /// Advance the active pattern by `elapsed_ms`.
    pub fn animate(&mut self, elapsed_ms: u32) {
        match self.pattern {
            Pattern::Steady => {}
            Pattern::Flash { remaining_ms } => {
                if elapsed_ms >= remaining_ms {
                    self.set_off();
                } else {
                    self.pattern = Pattern::Flash {
                        remaining_ms: remaining_ms - elapsed_ms,
                    };
                }
            }
            Pattern::Blinking {
                rate_ms,
                elapsed_ms: acc,
                mut toggles_left,
            } => {
                let mut acc = acc.saturating_add(elapsed_ms);
                while acc >= rate_ms {
                    acc -= rate_ms;
                    let next = !self.on;
                    self.drive(next);
                    if let Some(left) = toggles_left.as_mut() {
                        *left -= 1;
                        if *left == 0 {
                            self.set_off();
                            return;
                        }
                    }
                }
                self.pattern = Pattern::Blinking {
                    rate_ms,
                    elapsed_ms: acc,
                    toggles_left,
                };
            }
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// `true` while a flash or blink pattern is running.
    pub fn is_animating(&self) -> bool {
        self.pattern != Pattern::Steady
    }

    /// Give the pin back.
    pub fn release(self) -> P {
        self.pin
    }

    fn drive(&mut self, on: bool) {
        if self.on == on {
            return;
        }
        let res = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match res {
            Ok(()) => self.on = on,
            Err(e) => warn!("led: pin write failed: {:?}", e),
        }
    }
}

// ── Host pin ──────────────────────────────────────────────────

/// In-memory output pin.  Clones observe the same level.
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    level: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.store(false, Ordering::Release);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.store(true, Ordering::Release);
        Ok(())
    }
}
