//! Settings mirroring
//!
//! The Initiator owns the session settings. It sends the parts a Responder
//! must share (custom pattern, intensities, indicator, duration) and the
//! Responder overlays them on its own configuration. Mode is excluded: it
//! only changes through the two-phase commit.

use antiphase_protocol::CoordinationMessage;

use crate::config::{ConfigError, CustomPattern, LedConfig, SessionConfig};
use crate::mode::MODE_COUNT;

/// The mirrored subset of a [`SessionConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerSettings {
    pub custom: CustomPattern,
    pub intensity_pct: [u8; MODE_COUNT],
    pub led: LedConfig,
    pub session_duration_s: u32,
}

impl PeerSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            custom: config.custom,
            intensity_pct: config.intensity_pct,
            led: config.led,
            session_duration_s: config.session_duration_s,
        }
    }

    pub fn to_message(&self) -> CoordinationMessage {
        CoordinationMessage::Settings {
            freq_centihz: self.custom.freq_centihz,
            duty_pct: self.custom.duty_pct,
            intensity_pct: self.intensity_pct,
            led_enabled: self.led.enabled,
            led_color: self.led.color_index,
            led_brightness_pct: self.led.brightness_pct,
            session_duration_s: self.session_duration_s,
        }
    }

    /// `None` unless `msg` is a `Settings` message
    pub fn from_message(msg: &CoordinationMessage) -> Option<Self> {
        match *msg {
            CoordinationMessage::Settings {
                freq_centihz,
                duty_pct,
                intensity_pct,
                led_enabled,
                led_color,
                led_brightness_pct,
                session_duration_s,
            } => Some(Self {
                custom: CustomPattern {
                    freq_centihz,
                    duty_pct,
                },
                intensity_pct,
                led: LedConfig {
                    enabled: led_enabled,
                    brightness_pct: led_brightness_pct,
                    color_index: led_color,
                },
                session_duration_s,
            }),
            _ => None,
        }
    }

    /// Overlay onto a local configuration, keeping its mode
    pub fn apply_to(&self, config: SessionConfig) -> SessionConfig {
        SessionConfig {
            custom: self.custom,
            intensity_pct: self.intensity_pct,
            led: self.led,
            session_duration_s: self.session_duration_s,
            ..config
        }
    }

    /// Reject settings that would make `base` invalid
    pub fn validate_against(&self, base: SessionConfig) -> Result<(), ConfigError> {
        self.apply_to(base).validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;

    fn sample() -> PeerSettings {
        let mut config = SessionConfig::default();
        config.custom.duty_pct = 80;
        config.intensity_pct[Mode::Custom.index()] = 70;
        config.led.color_index = 5;
        config.session_duration_s = 1800;
        PeerSettings::from_config(&config)
    }

    #[test]
    fn test_message_carries_every_field() {
        let settings = sample();
        assert_eq!(
            PeerSettings::from_message(&settings.to_message()),
            Some(settings)
        );
        assert_eq!(
            PeerSettings::from_message(&CoordinationMessage::ResponderReady),
            None
        );
    }

    #[test]
    fn test_overlay_keeps_local_mode() {
        let mut local = SessionConfig::default();
        local.mode = Mode::Hz2;

        let merged = sample().apply_to(local);
        assert_eq!(merged.mode, Mode::Hz2);
        assert_eq!(merged.custom.duty_pct, 80);
        assert_eq!(merged.intensity_for(Mode::Custom), 70);
        assert_eq!(merged.led.color_index, 5);
        assert_eq!(merged.session_duration_s, 1800);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = sample();
        settings.intensity_pct[Mode::Hz2.index()] = 95;
        assert_eq!(
            settings.validate_against(SessionConfig::default()),
            Err(ConfigError::IntensityOutOfRange(Mode::Hz2))
        );
        assert_eq!(sample().validate_against(SessionConfig::default()), Ok(()));
    }
}
