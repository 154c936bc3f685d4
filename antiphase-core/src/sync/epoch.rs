//! Shared motor epoch
//!
//! The epoch anchors the Initiator's activation grid: the Initiator activates
//! at `epoch + k * cycle`, the Responder at `epoch + k * cycle + cycle / 2`.
//! All values are on the shared time base, in microseconds.

/// Shared timing reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorEpoch {
    /// First Initiator activation of the grid
    pub epoch_us: u64,
    pub cycle_ms: u32,
}

impl MotorEpoch {
    pub const fn new(epoch_us: u64, cycle_ms: u32) -> Self {
        Self { epoch_us, cycle_ms }
    }

    pub const fn cycle_us(&self) -> u64 {
        let us = self.cycle_ms as u64 * 1000;
        if us == 0 {
            1
        } else {
            us
        }
    }

    pub const fn half_cycle_us(&self) -> u64 {
        self.cycle_us() / 2
    }

    /// First Initiator grid point at or after `now_us`
    pub fn next_cycle_start(&self, now_us: u64) -> u64 {
        next_grid_point(self.epoch_us, self.cycle_us(), now_us, true)
    }

    /// First Responder activation strictly after `now_us`
    ///
    /// For any result `r`, `(r - epoch) % cycle == cycle / 2`. Calling again
    /// with any time before `r` yields the same `r`.
    pub fn responder_target(&self, now_us: u64) -> u64 {
        next_grid_point(
            self.epoch_us + self.half_cycle_us(),
            self.cycle_us(),
            now_us,
            false,
        )
    }
}

/// Smallest `anchor + k * period` (k may be negative) that is after `now`,
/// or at `now` when `inclusive`
fn next_grid_point(anchor: u64, period: u64, now: u64, inclusive: bool) -> u64 {
    if now < anchor {
        let back = (anchor - now - u64::from(!inclusive)) / period;
        anchor - back * period
    } else {
        let r = (now - anchor) % period;
        if r == 0 && inclusive {
            now
        } else {
            now + (period - r)
        }
    }
}
