//! Mode timing resolver
//!
//! Each cycle is split into two equal halves. The unit is active in one half
//! (motor on, then coasting) and idle in the other, so the peer can use it.

use crate::config::{CustomPattern, MAX_DUTY_PCT, MAX_FREQ_CENTIHZ, MIN_DUTY_PCT, MIN_FREQ_CENTIHZ};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of selectable modes
pub const MODE_COUNT: usize = 5;

/// Shortest and longest cycle any mode can resolve to
pub const MIN_CYCLE_MS: u32 = 100_000 / MAX_FREQ_CENTIHZ as u32;
pub const MAX_CYCLE_MS: u32 = 100_000 / MIN_FREQ_CENTIHZ as u32;

/// Duty used by the presets
const PRESET_DUTY_PCT: u8 = 50;

/// Stimulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// 0.5 Hz alternation
    Hz05,
    /// 1.0 Hz alternation
    #[default]
    Hz1,
    /// 1.5 Hz alternation
    Hz15,
    /// 2.0 Hz alternation
    Hz2,
    /// User frequency and duty
    Custom,
}

impl Mode {
    pub const ALL: [Mode; MODE_COUNT] = [Mode::Hz05, Mode::Hz1, Mode::Hz15, Mode::Hz2, Mode::Custom];

    /// Wire identifier
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Index into per-mode tables
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Fixed frequency of a preset, `None` for the custom mode
    pub const fn preset_freq_centihz(self) -> Option<u16> {
        match self {
            Mode::Hz05 => Some(50),
            Mode::Hz1 => Some(100),
            Mode::Hz15 => Some(150),
            Mode::Hz2 => Some(200),
            Mode::Custom => None,
        }
    }

    /// Allowed motor intensity range (percent)
    pub const fn intensity_range(self) -> (u8, u8) {
        match self {
            Mode::Hz05 | Mode::Hz1 => (50, 80),
            Mode::Hz15 | Mode::Hz2 => (70, 90),
            // 0 selects LED-only stimulation
            Mode::Custom => (0, 80),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Mode::Hz05 => "0.5Hz",
            Mode::Hz1 => "1.0Hz",
            Mode::Hz15 => "1.5Hz",
            Mode::Hz2 => "2.0Hz",
            Mode::Custom => "Custom",
        }
    }

    /// Next mode in button order, wrapping
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % MODE_COUNT]
    }
}

/// Resolved timing for one mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeConfig {
    pub name: &'static str,
    /// Motor driven at the start of the active half
    pub motor_on_ms: u32,
    /// Rest of the active half, motor coasting
    pub active_coast_ms: u32,
    /// Idle half while the peer is active
    pub inactive_ms: u32,
}

impl ModeConfig {
    pub const fn active_ms(&self) -> u32 {
        self.motor_on_ms + self.active_coast_ms
    }

    pub const fn cycle_ms(&self) -> u32 {
        self.active_ms() + self.inactive_ms
    }

    pub const fn cycle_us(&self) -> u64 {
        self.cycle_ms() as u64 * 1000
    }
}

/// Split a cycle into active/inactive halves with `duty_pct` of the
/// active half driven
pub const fn split_cycle(name: &'static str, cycle_ms: u32, duty_pct: u8) -> ModeConfig {
    let active_ms = cycle_ms / 2;
    let motor_on_ms = active_ms * duty_pct as u32 / 100;
    ModeConfig {
        name,
        motor_on_ms,
        active_coast_ms: active_ms - motor_on_ms,
        inactive_ms: cycle_ms - active_ms,
    }
}

/// Cycle length for a frequency in centihertz
pub const fn cycle_ms_for(freq_centihz: u16) -> u32 {
    100_000 / freq_centihz as u32
}

/// Resolve the timing for a mode
///
/// Custom values are clamped into their valid ranges; callers validate
/// settings before they reach the resolver.
pub fn resolve(mode: Mode, custom: CustomPattern) -> ModeConfig {
    match mode.preset_freq_centihz() {
        Some(freq) => split_cycle(mode.name(), cycle_ms_for(freq), PRESET_DUTY_PCT),
        None => {
            let freq = custom.freq_centihz.clamp(MIN_FREQ_CENTIHZ, MAX_FREQ_CENTIHZ);
            let duty = custom.duty_pct.clamp(MIN_DUTY_PCT, MAX_DUTY_PCT);
            split_cycle(mode.name(), cycle_ms_for(freq), duty)
        }
    }
}

/// Resolve timing for an agreed cycle length
///
/// Used when the cycle comes from the peer (a proposal or the shared epoch)
/// rather than from local settings.
pub fn resolve_cycle(mode: Mode, cycle_ms: u32, custom: CustomPattern) -> ModeConfig {
    let duty = match mode {
        Mode::Custom => custom.duty_pct.clamp(MIN_DUTY_PCT, MAX_DUTY_PCT),
        _ => PRESET_DUTY_PCT,
    };
    split_cycle(mode.name(), cycle_ms.clamp(MIN_CYCLE_MS, MAX_CYCLE_MS), duty)
}

/// Preset timings, indexed like [`Mode::ALL`]
pub const PRESETS: [ModeConfig; 4] = [
    split_cycle("0.5Hz", 2000, PRESET_DUTY_PCT),
    split_cycle("1.0Hz", 1000, PRESET_DUTY_PCT),
    split_cycle("1.5Hz", 666, PRESET_DUTY_PCT),
    split_cycle("2.0Hz", 500, PRESET_DUTY_PCT),
];
