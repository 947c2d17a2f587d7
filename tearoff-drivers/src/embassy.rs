//! `embassy-time` backed time source
//!
//! [`embassy_time::Delay`] already implements `DelayNs`; this adds the
//! matching [`Clock`].

use embassy_time::Instant;
use tearoff_core::traits::Clock;

pub use embassy_time::Delay as EmbassyDelay;

/// Clock reading the embassy time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
