//! Motor phase state machine
//!
//! One cycle is two phases. The Initiator (and a standalone unit) is active
//! first and idle second; the Responder waits out its half-cycle offset
//! first and is active second. `CheckMessages` sits between cycles.

use crate::sync::Role;
use crate::traits::Direction;

/// Motor task phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorPhase {
    /// Waiting for the pairing outcome
    PairingWait,
    /// Between cycles: events, settings, pending mode changes
    CheckMessages,
    /// Motor driven, then coasting
    Active,
    /// Idle half-cycle
    Inactive,
    /// Outputs off, task exits
    Shutdown,
}

impl MotorPhase {
    /// Phase after `CheckMessages`
    ///
    /// `offset_elapsed` is set when a Responder's half-cycle offset has
    /// already been waited out (coordinated start, mode-change commit).
    pub fn after_check(role: Role, offset_elapsed: bool) -> Self {
        match role {
            Role::Responder if !offset_elapsed => MotorPhase::Inactive,
            _ => MotorPhase::Active,
        }
    }

    /// Phase after a completed active half
    pub fn after_active(role: Role) -> Self {
        match role {
            Role::Responder => MotorPhase::CheckMessages,
            _ => MotorPhase::Inactive,
        }
    }

    /// Phase after a completed inactive half
    pub fn after_inactive(role: Role) -> Self {
        match role {
            Role::Responder => MotorPhase::Active,
            _ => MotorPhase::CheckMessages,
        }
    }

    /// Check if the motor may be driven in this phase
    pub fn motor_allowed(&self) -> bool {
        matches!(self, MotorPhase::Active)
    }
}

/// State written only by the motor task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorPhaseState {
    pub phase: MotorPhase,
    /// Direction for the next activation
    pub direction: Direction,
    /// Absolute start of the current (or next) activation, shared time
    pub cycle_start_us: u64,
}

impl Default for MotorPhaseState {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorPhaseState {
    pub const fn new() -> Self {
        Self {
            phase: MotorPhase::PairingWait,
            direction: Direction::Forward,
            cycle_start_us: 0,
        }
    }

    /// Flip direction for the next cycle
    pub fn toggle_direction(&mut self) {
        self.direction = self.direction.toggled();
    }
}
