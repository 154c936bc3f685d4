//! Task runtime services for the motor task

use crate::state::MotorEvent;

/// Event queue and watchdog of the task that owns the engine
#[allow(async_fn_in_trait)]
pub trait TaskRuntime {
    /// Take the next queued event without waiting
    fn try_receive(&mut self) -> Option<MotorEvent>;

    /// Wait up to `timeout_us` for the next event
    async fn receive_within(&mut self, timeout_us: u64) -> Option<MotorEvent>;

    fn feed_watchdog(&mut self);
}
