//! Peripheral drivers and the software timer service.

pub mod button;
pub mod led;
pub mod pump;
pub mod timer;
