//! Motor task state
//!
//! Phases of the activation cycle and the events that drive them.

pub mod events;
pub mod machine;

pub use events::{MotorEvent, SessionEnd, SessionEvent};
pub use machine::{MotorPhase, MotorPhaseState};
