//! Clock synchronization service
//!
//! Methods take `&self`: the service is shared between the motor task and
//! the link tasks, so implementations use interior mutability.

use crate::sync::{ClockQuality, MotorEpoch, Reconnect, Role};

pub trait ClockSync {
    /// Current time on the shared time base, microseconds
    fn now_us(&self) -> u64;

    fn role(&self) -> Role;

    /// Initialise for a session with the given role
    fn begin_session(&self, role: Role);

    /// Discard role, offset and epoch
    fn end_session(&self);

    fn motor_epoch(&self) -> Option<MotorEpoch>;

    fn set_motor_epoch(&self, epoch: MotorEpoch);

    /// Local-to-shared offset, microseconds
    fn clock_offset_us(&self) -> i64;

    fn quality(&self) -> ClockQuality;

    fn handshake_complete(&self) -> bool;

    /// Advisory only
    fn antiphase_locked(&self) -> bool;

    /// Freeze the epoch for an outage
    fn link_lost(&self);

    /// End an outage and decide whether the session survives
    fn link_restored(&self) -> Reconnect;

    /// The peer rebooted and rejoined; drop anything tied to its old clock
    fn peer_rebooted(&self);
}

impl<T: ClockSync + ?Sized> ClockSync for &T {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }

    fn role(&self) -> Role {
        (**self).role()
    }

    fn begin_session(&self, role: Role) {
        (**self).begin_session(role)
    }

    fn end_session(&self) {
        (**self).end_session()
    }

    fn motor_epoch(&self) -> Option<MotorEpoch> {
        (**self).motor_epoch()
    }

    fn set_motor_epoch(&self, epoch: MotorEpoch) {
        (**self).set_motor_epoch(epoch)
    }

    fn clock_offset_us(&self) -> i64 {
        (**self).clock_offset_us()
    }

    fn quality(&self) -> ClockQuality {
        (**self).quality()
    }

    fn handshake_complete(&self) -> bool {
        (**self).handshake_complete()
    }

    fn antiphase_locked(&self) -> bool {
        (**self).antiphase_locked()
    }

    fn link_lost(&self) {
        (**self).link_lost()
    }

    fn link_restored(&self) -> Reconnect {
        (**self).link_restored()
    }

    fn peer_rebooted(&self) {
        (**self).peer_rebooted()
    }
}
