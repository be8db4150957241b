//! Monotonic clock adapter.
//!
//! Timestamps for button edges and uptime logging.
//!
//! - **`espidf` feature**: wraps `esp_timer_get_time()` (microsecond
//!   precision, monotonic since boot).
//! - **otherwise**: `std::time::Instant` relative to construction.

/// Milliseconds and microseconds since boot.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot.
    #[cfg(feature = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since construction.
    #[cfg(not(feature = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Milliseconds, truncated to `u32` (wraps after ~49 days).  Button
    /// timing uses wrapping arithmetic, so the wrap is harmless.
    pub fn now_ms(&self) -> u32 {
        (self.uptime_us() / 1000) as u32
    }
}
