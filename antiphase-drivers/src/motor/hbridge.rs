//! H-bridge vibration motor driver
//!
//! Drives an ERM motor through a two-input H-bridge (DRV8833 style):
//!
//! | IN1 | IN2 | state   |
//! |-----|-----|---------|
//! | PWM | 0   | forward |
//! | 0   | PWM | reverse |
//! | 0   | 0   | coast   |
//!
//! The inactive input is always cleared before the active one is driven, so
//! both halves are never on together.

use embedded_hal::pwm::SetDutyCycle;

/// H-bridge configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HBridgeConfig {
    /// Duty below which the motor does not spin up
    pub min_duty_pct: u8,
    /// Duty cap, protects a motor rated below the supply voltage
    pub max_duty_pct: u8,
}

impl Default for HBridgeConfig {
    fn default() -> Self {
        Self {
            min_duty_pct: 25,
            max_duty_pct: 100,
        }
    }
}

/// Bridge output state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeState {
    Coast,
    Forward(u8),
    Reverse(u8),
}

pub struct HBridge<A, B> {
    in1: A,
    in2: B,
    config: HBridgeConfig,
    state: BridgeState,
}

impl<A, B> HBridge<A, B>
where
    A: SetDutyCycle,
    B: SetDutyCycle,
{
    /// Create a driver; both inputs are released immediately
    pub fn new(in1: A, in2: B, config: HBridgeConfig) -> Result<Self, BridgeError<A::Error, B::Error>> {
        let mut bridge = Self {
            in1,
            in2,
            config,
            state: BridgeState::Coast,
        };
        bridge.coast()?;
        Ok(bridge)
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn config(&self) -> &HBridgeConfig {
        &self.config
    }

    /// Map intensity 1-100 % onto `min_duty..=max_duty`; 0 stays off
    pub fn scale_duty(&self, intensity_pct: u8) -> u8 {
        if intensity_pct == 0 {
            return 0;
        }
        let min = self.config.min_duty_pct.min(self.config.max_duty_pct) as u32;
        let range = self.config.max_duty_pct as u32 - min;
        (min + intensity_pct.min(100) as u32 * range / 100) as u8
    }

    pub fn forward(&mut self, intensity_pct: u8) -> Result<(), BridgeError<A::Error, B::Error>> {
        let duty = self.scale_duty(intensity_pct);
        self.in2.set_duty_cycle_fully_off().map_err(BridgeError::In2)?;
        self.in1.set_duty_cycle_percent(duty).map_err(BridgeError::In1)?;
        self.state = if duty == 0 {
            BridgeState::Coast
        } else {
            BridgeState::Forward(duty)
        };
        Ok(())
    }

    pub fn reverse(&mut self, intensity_pct: u8) -> Result<(), BridgeError<A::Error, B::Error>> {
        let duty = self.scale_duty(intensity_pct);
        self.in1.set_duty_cycle_fully_off().map_err(BridgeError::In1)?;
        self.in2.set_duty_cycle_percent(duty).map_err(BridgeError::In2)?;
        self.state = if duty == 0 {
            BridgeState::Coast
        } else {
            BridgeState::Reverse(duty)
        };
        Ok(())
    }

    /// Release both inputs
    pub fn coast(&mut self) -> Result<(), BridgeError<A::Error, B::Error>> {
        let first = self.in1.set_duty_cycle_fully_off().map_err(BridgeError::In1);
        let second = self.in2.set_duty_cycle_fully_off().map_err(BridgeError::In2);
        self.state = BridgeState::Coast;
        first.and(second)
    }
}

/// PWM failure on one bridge input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeError<E1, E2> {
    In1(E1),
    In2(E2),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::pwm::ErrorType;

    /// PWM channel that records its duty
    #[derive(Debug, Default)]
    pub struct MockPwm {
        pub duty: u16,
        pub writes: u32,
    }

    impl ErrorType for MockPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for MockPwm {
        fn max_duty_cycle(&self) -> u16 {
            1000
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.duty = duty;
            self.writes += 1;
            Ok(())
        }
    }

    fn bridge() -> HBridge<MockPwm, MockPwm> {
        HBridge::new(MockPwm::default(), MockPwm::default(), HBridgeConfig::default()).unwrap()
    }

    #[test]
    fn test_new_releases_both_inputs() {
        let bridge = bridge();
        assert_eq!(bridge.state(), BridgeState::Coast);
        assert_eq!(bridge.in1.writes, 1);
        assert_eq!(bridge.in2.writes, 1);
    }

    #[test]
    fn test_duty_scaling() {
        let bridge = bridge();
        assert_eq!(bridge.scale_duty(0), 0);
        assert_eq!(bridge.scale_duty(100), 100);
        // 25 + 40 % of 75
        assert_eq!(bridge.scale_duty(40), 55);
        assert_eq!(bridge.scale_duty(250), 100);
    }

    #[test]
    fn test_duty_cap() {
        let mut bridge = HBridge::new(
            MockPwm::default(),
            MockPwm::default(),
            HBridgeConfig {
                min_duty_pct: 20,
                max_duty_pct: 60,
            },
        )
        .unwrap();
        bridge.forward(100).unwrap();
        assert_eq!(bridge.state(), BridgeState::Forward(60));
        assert_eq!(bridge.in1.duty, 600);
    }

    #[test]
    fn test_forward_then_reverse() {
        let mut bridge = bridge();

        bridge.forward(100).unwrap();
        assert_eq!(bridge.in1.duty, 1000);
        assert_eq!(bridge.in2.duty, 0);

        bridge.reverse(100).unwrap();
        assert_eq!(bridge.in1.duty, 0);
        assert_eq!(bridge.in2.duty, 1000);
        assert_eq!(bridge.state(), BridgeState::Reverse(100));

        bridge.coast().unwrap();
        assert_eq!((bridge.in1.duty, bridge.in2.duty), (0, 0));
        assert_eq!(bridge.state(), BridgeState::Coast);
    }

    #[test]
    fn test_zero_intensity_is_coast() {
        let mut bridge = bridge();
        bridge.forward(0).unwrap();
        assert_eq!(bridge.state(), BridgeState::Coast);
        assert_eq!(bridge.in1.duty, 0);
    }
}
