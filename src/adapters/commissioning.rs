//! Simulated commissioning stack.
//!
//! Implements [`CommissioningPort`] for the host build: records what the
//! device apps asked for and logs it.  A device build replaces this with
//! the protocol stack's own connectivity and server managers.

use log::info;

use crate::app::ports::{CommissioningError, CommissioningPort};

#[derive(Debug, Default)]
pub struct SimCommissioning {
    advertising: bool,
    windows_opened: u32,
    factory_reset_pending: bool,
    ota_ready: bool,
    fabric_full: bool,
}

impl SimCommissioning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse new commissioning windows from now on.
    pub fn set_fabric_full(&mut self, full: bool) {
        self.fabric_full = full;
    }

    pub fn windows_opened(&self) -> u32 {
        self.windows_opened
    }

    pub fn factory_reset_pending(&self) -> bool {
        self.factory_reset_pending
    }

    pub fn ota_ready(&self) -> bool {
        self.ota_ready
    }
}

impl CommissioningPort for SimCommissioning {
    fn is_advertising(&self) -> bool {
        self.advertising
    }

    fn open_commissioning_window(&mut self) -> Result<(), CommissioningError> {
        if self.fabric_full {
            return Err(CommissioningError::WindowUnavailable);
        }
        self.advertising = true;
        self.windows_opened += 1;
        info!("commissioning: window open");
        Ok(())
    }

    fn set_advertising(&mut self, enabled: bool) {
        self.advertising = enabled;
    }

    fn schedule_factory_reset(&mut self) {
        self.factory_reset_pending = true;
        info!("commissioning: factory reset pending");
    }

    fn init_ota_requestor(&mut self) {
        if !self.ota_ready {
            self.ota_ready = true;
            info!("commissioning: OTA requestor initialised");
        }
    }
}
