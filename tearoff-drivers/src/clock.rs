//! Simulated time
//!
//! [`SimClock`] advances only when something waits on it. Used as both the
//! delay source and the clock of a separation, the reported elapsed time
//! equals the sum of the waits.

use core::cell::{Cell, RefCell};

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use tearoff_core::traits::Clock;

/// Number of `delay_ms` calls kept for inspection
pub const MAX_RECORDED_WAITS: usize = 64;

const NS_PER_MS: u64 = 1_000_000;

/// Manually advanced clock and delay source
#[derive(Debug, Default)]
pub struct SimClock {
    now_ns: Cell<u64>,
    waits: RefCell<Vec<u32, MAX_RECORDED_WAITS>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time without recording a wait
    pub fn advance_ms(&self, ms: u32) {
        self.advance_ns(ms as u64 * NS_PER_MS);
    }

    fn advance_ns(&self, ns: u64) {
        self.now_ns.set(self.now_ns.get().saturating_add(ns));
    }

    /// Millisecond waits requested so far, in order
    pub fn waits(&self) -> Vec<u32, MAX_RECORDED_WAITS> {
        self.waits.borrow().clone()
    }

    /// Sum of all recorded waits
    pub fn total_wait_ms(&self) -> u64 {
        self.waits.borrow().iter().map(|&ms| ms as u64).sum()
    }

    pub fn clear_waits(&self) {
        self.waits.borrow_mut().clear();
    }

    fn wait_ms(&self, ms: u32) {
        // Waits beyond the record limit still advance time
        let _ = self.waits.borrow_mut().push(ms);
        self.advance_ms(ms);
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now_ns.get() / NS_PER_MS
    }
}

impl DelayNs for SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance_ns(ns as u64);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.wait_ms(ms);
    }
}

impl DelayNs for &SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.advance_ns(ns as u64);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.wait_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waits_advance_time() {
        let clock = SimClock::new();
        let mut delay = &clock;

        delay.delay_ms(50);
        delay.delay_ms(1000);

        assert_eq!(clock.now_ms(), 1050);
        assert_eq!(clock.waits().as_slice(), &[50, 1000]);
        assert_eq!(clock.total_wait_ms(), 1050);
    }

    #[test]
    fn test_sub_millisecond_delays() {
        let mut clock = SimClock::new();

        clock.delay_us(600);
        assert_eq!(clock.now_ms(), 0);
        clock.delay_us(600);
        assert_eq!(clock.now_ms(), 1);
        assert!(clock.waits().is_empty());
    }

    #[test]
    fn test_advance_is_not_a_wait() {
        let clock = SimClock::new();

        clock.advance_ms(20);
        assert_eq!(clock.now_ms(), 20);
        assert_eq!(clock.total_wait_ms(), 0);
    }
}
