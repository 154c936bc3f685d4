//! RGB indicator LED on three PWM channels
//!
//! The engine selects a palette entry and a brightness; this driver turns
//! that into per-channel duty. Brightness is applied linearly on top of the
//! palette colour, which is already gamma corrected.

use antiphase_core::config::PALETTE_SIZE;
use antiphase_core::traits::Indicator;
use embedded_hal::pwm::SetDutyCycle;

/// 8-bit colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const fn rgb(r: u8, g: u8, b: u8) -> Rgb {
    Rgb { r, g, b }
}

/// Selectable indicator colours
pub const PALETTE: [Rgb; PALETTE_SIZE as usize] = [
    rgb(255, 0, 0),     // red
    rgb(255, 64, 0),    // orange
    rgb(255, 160, 0),   // amber
    rgb(255, 255, 0),   // yellow
    rgb(128, 255, 0),   // lime
    rgb(0, 255, 0),     // green
    rgb(0, 255, 96),    // spring
    rgb(0, 255, 255),   // cyan
    rgb(0, 128, 255),   // sky
    rgb(0, 0, 255),     // blue
    rgb(96, 0, 255),    // indigo
    rgb(160, 0, 255),   // violet
    rgb(255, 0, 255),   // magenta
    rgb(255, 0, 96),    // rose
    rgb(255, 200, 160), // warm white
    rgb(255, 255, 255), // white
];

pub struct RgbIndicator<R, G, B> {
    red: R,
    green: G,
    blue: B,
    /// Common-anode LEDs light when the channel is low
    inverted: bool,
    current: Indicator,
}

impl<R, G, B> RgbIndicator<R, G, B>
where
    R: SetDutyCycle,
    G: SetDutyCycle,
    B: SetDutyCycle,
{
    pub fn new(red: R, green: G, blue: B, inverted: bool) -> Self {
        let mut led = Self {
            red,
            green,
            blue,
            inverted,
            current: Indicator::Lit {
                color_index: 0,
                brightness_pct: 0,
            },
        };
        led.set(Indicator::Off);
        led
    }

    pub fn current(&self) -> Indicator {
        self.current
    }

    /// Show `indicator`; returns false if a channel rejected its duty
    pub fn set(&mut self, indicator: Indicator) -> bool {
        if indicator == self.current {
            return true;
        }

        let (colour, brightness) = match indicator {
            Indicator::Off => (rgb(0, 0, 0), 0),
            Indicator::Lit {
                color_index,
                brightness_pct,
            } => (
                PALETTE[(color_index % PALETTE_SIZE) as usize],
                brightness_pct.min(100),
            ),
        };

        let ok = write_channel(&mut self.red, colour.r, brightness, self.inverted)
            & write_channel(&mut self.green, colour.g, brightness, self.inverted)
            & write_channel(&mut self.blue, colour.b, brightness, self.inverted);
        if ok {
            self.current = indicator;
        }
        ok
    }
}

fn write_channel<P: SetDutyCycle>(pwm: &mut P, level: u8, brightness_pct: u8, inverted: bool) -> bool {
    // level/255 * brightness/100 of full scale
    let num = level as u16 * brightness_pct as u16;
    let denom = 255 * 100;
    let num = if inverted { denom - num } else { num };
    pwm.set_duty_cycle_fraction(num, denom).is_ok()
}
