//! Precision one-shot alarm

/// Errors arming the alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmError {
    /// No hardware alarm on this unit; fall back to polling
    Unavailable,
    /// Target already passed
    InPast,
}

/// One-shot alarm whose only effect is queueing `MotorEvent::TimerFired`
///
/// Targets are on the shared time base. Arming again replaces the
/// previous target.
pub trait PrecisionAlarm {
    fn arm(&mut self, target_us: u64) -> Result<(), AlarmError>;

    fn cancel(&mut self);
}

/// Alarm for units without a precision timer
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAlarm;

impl PrecisionAlarm for NoAlarm {
    fn arm(&mut self, _target_us: u64) -> Result<(), AlarmError> {
        Err(AlarmError::Unavailable)
    }

    fn cancel(&mut self) {}
}
