//! Haptic output traits
//!
//! The engine drives one vibration motor through an H-bridge and one
//! indicator LED. Duty generation and colour mapping stay in the driver.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Motor drive direction
///
/// Alternated every cycle to spread wear on the motor brushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub const fn toggled(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Indicator LED state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    Off,
    Lit { color_index: u8, brightness_pct: u8 },
}

/// Motor and indicator output
///
/// Calls never block and never fail; an output that cannot act logs and
/// ignores the request.
pub trait HapticOutput {
    /// Drive the motor forward at `intensity_pct` (0-100)
    fn drive_forward(&mut self, intensity_pct: u8);

    /// Drive the motor in reverse at `intensity_pct` (0-100)
    fn drive_reverse(&mut self, intensity_pct: u8);

    /// Release both bridge halves, motor spins down freely
    fn coast(&mut self);

    fn set_indicator(&mut self, indicator: Indicator);

    /// Drive in the given direction
    fn drive(&mut self, direction: Direction, intensity_pct: u8) {
        match direction {
            Direction::Forward => self.drive_forward(intensity_pct),
            Direction::Reverse => self.drive_reverse(intensity_pct),
        }
    }
}
