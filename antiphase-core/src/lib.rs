//! Board-agnostic core of the bilateral haptic controller
//!
//! Two units alternate vibration pulses exactly half a cycle apart. This
//! crate holds everything that does not touch hardware:
//!
//! - Session configuration and mode timing
//! - Clock synchronization context and the shared motor epoch
//! - Coordinated start and two-phase mode change
//! - The motor phase state machine and engine loop
//! - Peer link outage tracking
//! - Collaborator traits the firmware implements (clock, link, motor, alarm)
//!
//! All engine times are microseconds on the shared time base, which is the
//! Initiator's clock.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to every module
mod fmt;

pub mod config;
pub mod coordination;
pub mod engine;
pub mod mode;
pub mod safety;
pub mod state;
pub mod sync;
pub mod traits;

#[cfg(test)]
mod sim;
