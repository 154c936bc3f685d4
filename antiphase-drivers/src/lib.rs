//! Hardware driver implementations
//!
//! Concrete implementations of the output traits defined in
//! antiphase-core, written against `embedded-hal` 1.0:
//!
//! - H-bridge vibration motor (two PWM inputs)
//! - RGB indicator LED with a fixed palette
//! - Battery gauge (cell voltage to charge percentage)
//! - [`HapticBoard`], the combination handed to the engine

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod battery;
pub mod board;
pub mod indicator;
pub mod motor;

pub use board::HapticBoard;
