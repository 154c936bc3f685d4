//! Session configuration
//!
//! The configuration provider hands the engine a snapshot of these values
//! once per cycle. Values are validated where they enter the system; the
//! engine trusts a snapshot it receives.

use crate::mode::{Mode, MODE_COUNT};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Custom mode frequency range in centihertz (0.25 - 2.00 Hz)
pub const MIN_FREQ_CENTIHZ: u16 = 25;
pub const MAX_FREQ_CENTIHZ: u16 = 200;

/// Custom mode duty range (percent of the active half-cycle)
pub const MIN_DUTY_PCT: u8 = 10;
pub const MAX_DUTY_PCT: u8 = 100;

/// Indicator brightness range
pub const MIN_BRIGHTNESS_PCT: u8 = 10;
pub const MAX_BRIGHTNESS_PCT: u8 = 30;

/// Number of palette entries selectable for the indicator
pub const PALETTE_SIZE: u8 = 16;

/// Session duration range in seconds (20 - 90 minutes)
pub const MIN_SESSION_S: u32 = 1200;
pub const MAX_SESSION_S: u32 = 5400;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Custom frequency outside 25-200 centihertz
    FrequencyOutOfRange,
    /// Custom duty outside 10-100 %
    DutyOutOfRange,
    /// Motor intensity outside the range allowed for this mode
    IntensityOutOfRange(Mode),
    /// Indicator brightness outside 10-30 %
    BrightnessOutOfRange,
    /// Palette index beyond the palette
    ColorOutOfRange,
    /// Session duration outside 1200-5400 s
    DurationOutOfRange,
}

/// Custom mode pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CustomPattern {
    /// Bilateral alternation frequency in centihertz
    pub freq_centihz: u16,
    /// Motor-on share of the active half-cycle, percent
    pub duty_pct: u8,
}

impl Default for CustomPattern {
    fn default() -> Self {
        Self {
            freq_centihz: 100,
            duty_pct: 50,
        }
    }
}

/// Indicator LED settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LedConfig {
    /// Show the indicator for the whole session in custom mode
    pub enabled: bool,
    pub brightness_pct: u8,
    pub color_index: u8,
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            brightness_pct: 20,
            color_index: 0,
        }
    }
}

/// Complete session configuration snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionConfig {
    /// Mode selected at session start
    pub mode: Mode,
    pub custom: CustomPattern,
    /// Motor intensity per mode, indexed by [`Mode::index`]
    pub intensity_pct: [u8; MODE_COUNT],
    pub led: LedConfig,
    pub session_duration_s: u32,
}

impl SessionConfig {
    pub const DEFAULT: Self = Self {
        mode: Mode::Hz1,
        custom: CustomPattern {
            freq_centihz: 100,
            duty_pct: 50,
        },
        intensity_pct: [65, 65, 80, 80, 60],
        led: LedConfig {
            enabled: true,
            brightness_pct: 20,
            color_index: 0,
        },
        session_duration_s: MIN_SESSION_S,
    };

    /// Motor intensity for a mode
    pub fn intensity_for(&self, mode: Mode) -> u8 {
        self.intensity_pct[mode.index()]
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_FREQ_CENTIHZ..=MAX_FREQ_CENTIHZ).contains(&self.custom.freq_centihz) {
            return Err(ConfigError::FrequencyOutOfRange);
        }
        if !(MIN_DUTY_PCT..=MAX_DUTY_PCT).contains(&self.custom.duty_pct) {
            return Err(ConfigError::DutyOutOfRange);
        }
        for mode in Mode::ALL {
            let (lo, hi) = mode.intensity_range();
            if !(lo..=hi).contains(&self.intensity_for(mode)) {
                return Err(ConfigError::IntensityOutOfRange(mode));
            }
        }
        if !(MIN_BRIGHTNESS_PCT..=MAX_BRIGHTNESS_PCT).contains(&self.led.brightness_pct) {
            return Err(ConfigError::BrightnessOutOfRange);
        }
        if self.led.color_index >= PALETTE_SIZE {
            return Err(ConfigError::ColorOutOfRange);
        }
        if !(MIN_SESSION_S..=MAX_SESSION_S).contains(&self.session_duration_s) {
            return Err(ConfigError::DurationOutOfRange);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(SessionConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_frequency_bounds() {
        let mut config = SessionConfig::default();
        config.custom.freq_centihz = 24;
        assert_eq!(config.validate(), Err(ConfigError::FrequencyOutOfRange));
        config.custom.freq_centihz = 201;
        assert_eq!(config.validate(), Err(ConfigError::FrequencyOutOfRange));
        config.custom.freq_centihz = 25;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_duty_bounds() {
        let mut config = SessionConfig::default();
        config.custom.duty_pct = 9;
        assert_eq!(config.validate(), Err(ConfigError::DutyOutOfRange));
        config.custom.duty_pct = 100;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_intensity_per_mode() {
        let mut config = SessionConfig::default();
        config.intensity_pct[Mode::Hz2.index()] = 60; // below 70 for fast presets
        assert_eq!(
            config.validate(),
            Err(ConfigError::IntensityOutOfRange(Mode::Hz2))
        );

        let mut config = SessionConfig::default();
        config.intensity_pct[Mode::Custom.index()] = 0; // LED-only
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_led_and_duration_bounds() {
        let mut config = SessionConfig::default();
        config.led.brightness_pct = 31;
        assert_eq!(config.validate(), Err(ConfigError::BrightnessOutOfRange));

        let mut config = SessionConfig::default();
        config.led.color_index = PALETTE_SIZE;
        assert_eq!(config.validate(), Err(ConfigError::ColorOutOfRange));

        let mut config = SessionConfig::default();
        config.session_duration_s = 5401;
        assert_eq!(config.validate(), Err(ConfigError::DurationOutOfRange));
    }
}
