//! Shared synchronization context
//!
//! One `SyncContext` behind a critical-section mutex. The link tasks feed it
//! clock exchanges and beacons; the motor task reads it through the
//! [`ClockSync`] trait.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;

use antiphase_core::sync::{ClockQuality, MotorEpoch, Reconnect, Role, SyncContext};
use antiphase_core::traits::ClockSync;

pub static SYNC: SharedSync = SharedSync::new();

/// Microseconds since boot on this unit's clock
pub fn local_now() -> u64 {
    Instant::now().as_micros()
}

pub struct SharedSync {
    ctx: Mutex<CriticalSectionRawMutex, RefCell<SyncContext>>,
}

impl SharedSync {
    pub const fn new() -> Self {
        Self {
            ctx: Mutex::new(RefCell::new(SyncContext::new())),
        }
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut SyncContext) -> T) -> T {
        self.ctx.lock(|ctx| f(&mut ctx.borrow_mut()))
    }
}

impl ClockSync for SharedSync {
    fn now_us(&self) -> u64 {
        self.with(|c| c.shared_time(local_now()))
    }

    fn role(&self) -> Role {
        self.with(|c| c.role())
    }

    fn begin_session(&self, role: Role) {
        self.with(|c| c.begin_session(role))
    }

    fn end_session(&self) {
        self.with(|c| c.end_session())
    }

    fn motor_epoch(&self) -> Option<MotorEpoch> {
        self.with(|c| c.motor_epoch(local_now()))
    }

    fn set_motor_epoch(&self, epoch: MotorEpoch) {
        self.with(|c| c.set_motor_epoch(epoch))
    }

    fn clock_offset_us(&self) -> i64 {
        self.with(|c| c.clock_offset_us())
    }

    fn quality(&self) -> ClockQuality {
        self.with(|c| c.quality())
    }

    fn handshake_complete(&self) -> bool {
        self.with(|c| c.handshake_complete())
    }

    fn antiphase_locked(&self) -> bool {
        self.with(|c| c.antiphase_locked(local_now()))
    }

    fn link_lost(&self) {
        self.with(|c| c.link_lost(local_now()))
    }

    fn link_restored(&self) -> Reconnect {
        self.with(|c| c.link_restored(local_now()))
    }

    fn peer_rebooted(&self) {
        self.with(|c| c.peer_rebooted(local_now()))
    }
}
