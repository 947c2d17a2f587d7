//! Board-agnostic layer separation controller for SLA printers
//!
//! After every exposed layer the tilt mechanism and the tower have to peel
//! the cured layer off the vat membrane before the next exposure. This crate
//! contains all logic that does not depend on a specific motion controller:
//!
//! - Moving profile tables and area-dependent exposure profiles
//! - Axis driver, clock and abort traits
//! - The layer separation plan (pure state machine) and its driving loop
//! - Stall detection and the unstuck (homing retry) procedure

#![no_std]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod motion;
pub mod safety;
pub mod separation;
pub mod traits;
