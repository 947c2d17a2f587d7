//! Axis driver and time source implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in tearoff-core:
//!
//! - Virtual tilt and tower axes with stall and fault injection
//! - A simulated clock that doubles as the delay source
//! - An `embassy-time` clock (feature `embassy`)

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod virtual_axis;

#[cfg(feature = "embassy")]
pub mod embassy;

pub use clock::{SimClock, MAX_RECORDED_WAITS};
pub use virtual_axis::{AxisCommand, VirtualAxis, VirtualTilt, VirtualTower, MAX_TRACE};
