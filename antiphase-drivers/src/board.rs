//! Haptic board
//!
//! Motor bridge plus indicator LED behind the engine's [`HapticOutput`]
//! trait. Output calls cannot fail from the engine's point of view; PWM
//! errors are counted and the outputs are left released.

use antiphase_core::traits::{HapticOutput, Indicator};
use embedded_hal::pwm::SetDutyCycle;

use crate::indicator::RgbIndicator;
use crate::motor::HBridge;

pub struct HapticBoard<A, B, R, G, L> {
    motor: HBridge<A, B>,
    indicator: RgbIndicator<R, G, L>,
    faults: u32,
}

impl<A, B, R, G, L> HapticBoard<A, B, R, G, L>
where
    A: SetDutyCycle,
    B: SetDutyCycle,
    R: SetDutyCycle,
    G: SetDutyCycle,
    L: SetDutyCycle,
{
    pub fn new(motor: HBridge<A, B>, indicator: RgbIndicator<R, G, L>) -> Self {
        Self {
            motor,
            indicator,
            faults: 0,
        }
    }

    pub fn motor(&self) -> &HBridge<A, B> {
        &self.motor
    }

    pub fn indicator(&self) -> &RgbIndicator<R, G, L> {
        &self.indicator
    }

    /// PWM writes that failed
    pub fn faults(&self) -> u32 {
        self.faults
    }

    fn motor_fault(&mut self) {
        self.faults = self.faults.saturating_add(1);
        let _ = self.motor.coast();
    }
}

impl<A, B, R, G, L> HapticOutput for HapticBoard<A, B, R, G, L>
where
    A: SetDutyCycle,
    B: SetDutyCycle,
    R: SetDutyCycle,
    G: SetDutyCycle,
    L: SetDutyCycle,
{
    fn drive_forward(&mut self, intensity_pct: u8) {
        if self.motor.forward(intensity_pct).is_err() {
            self.motor_fault();
        }
    }

    fn drive_reverse(&mut self, intensity_pct: u8) {
        if self.motor.reverse(intensity_pct).is_err() {
            self.motor_fault();
        }
    }

    fn coast(&mut self) {
        if self.motor.coast().is_err() {
            self.faults = self.faults.saturating_add(1);
        }
    }

    fn set_indicator(&mut self, indicator: Indicator) {
        if !self.indicator.set(indicator) {
            self.faults = self.faults.saturating_add(1);
        }
    }
}
