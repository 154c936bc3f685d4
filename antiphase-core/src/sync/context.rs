//! Synchronization context
//!
//! Single owner of the session role, the clock offset to the Initiator's
//! time base and the shared motor epoch. The firmware keeps one instance
//! behind a mutex; every method takes the caller's local time so the type
//! itself stays free of any clock source.

use crate::safety::{LinkMonitor, LinkStatus};

use super::epoch::MotorEpoch;
use super::role::Role;

/// Round trips slower than this are discarded as unreliable samples
pub const MAX_ROUND_TRIP_US: u64 = 50_000;

/// Quality score required before phase is reported as locked
pub const LOCK_QUALITY: u8 = 80;

/// Clock synchronization quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockQuality {
    /// 0-100, 100 is best
    pub score: u8,
    /// Smoothed change of the offset between samples
    pub avg_drift_us: u32,
}

/// What to do with the session after the link comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reconnect {
    /// Roles and epoch survived the outage
    Resume,
    /// Epoch discarded, run the startup again with the same roles
    Restart,
}

#[derive(Debug, Clone)]
pub struct SyncContext {
    role: Role,
    /// shared = local + offset
    offset_us: i64,
    samples: u32,
    handshake_complete: bool,
    quality: ClockQuality,
    epoch: Option<MotorEpoch>,
    link: LinkMonitor,
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncContext {
    pub const fn new() -> Self {
        Self {
            role: Role::None,
            offset_us: 0,
            samples: 0,
            handshake_complete: false,
            quality: ClockQuality {
                score: 0,
                avg_drift_us: 0,
            },
            epoch: None,
            link: LinkMonitor::new(),
        }
    }

    /// Start a session with the given role
    ///
    /// The Initiator is its own time base, so its handshake is complete
    /// immediately. A Responder keeps any offset it already measured.
    pub fn begin_session(&mut self, role: Role) {
        if self.role != role {
            self.epoch = None;
        }
        self.role = role;
        if role != Role::Responder {
            self.offset_us = 0;
            self.handshake_complete = true;
            self.quality = ClockQuality {
                score: 100,
                avg_drift_us: 0,
            };
        }
    }

    /// Forget the session entirely
    pub fn end_session(&mut self) {
        *self = Self::new();
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn shared_time(&self, local_us: u64) -> u64 {
        local_us.saturating_add_signed(self.offset_us)
    }

    pub fn local_time(&self, shared_us: u64) -> u64 {
        shared_us.saturating_add_signed(-self.offset_us)
    }

    pub fn clock_offset_us(&self) -> i64 {
        self.offset_us
    }

    pub fn quality(&self) -> ClockQuality {
        self.quality
    }

    pub fn handshake_complete(&self) -> bool {
        self.handshake_complete
    }

    /// Apply one request/reply exchange
    ///
    /// `t1`/`t4` are local send/receive times, `t2`/`t3` the Initiator's
    /// receive/send times. Returns false if the sample was discarded.
    pub fn record_exchange(&mut self, t1: u64, t2: u64, t3: u64, t4: u64) -> bool {
        let round_trip = t4.saturating_sub(t1).saturating_sub(t3.saturating_sub(t2));
        if t4 < t1 || round_trip > MAX_ROUND_TRIP_US {
            return false;
        }

        let offset = ((t2 as i64 - t1 as i64) + (t3 as i64 - t4 as i64)) / 2;
        self.link.heard(t4);

        if self.samples == 0 {
            self.offset_us = offset;
        } else {
            let drift = offset.abs_diff(self.offset_us).min(u32::MAX as u64) as u32;
            // Exponential smoothing, 1/4 weight on the new sample
            self.offset_us += (offset - self.offset_us) / 4;
            self.quality.avg_drift_us =
                ((self.quality.avg_drift_us as u64 * 3 + drift as u64) / 4) as u32;
        }
        self.samples = self.samples.saturating_add(1);
        self.handshake_complete = true;
        self.quality.score = score_for(self.quality.avg_drift_us);
        true
    }

    /// Record an Initiator beacon, taking its epoch verbatim
    pub fn record_beacon(&mut self, local_us: u64, epoch: Option<MotorEpoch>) {
        self.link.heard(local_us);
        if self.role == Role::Responder {
            if let Some(epoch) = epoch {
                self.epoch = Some(epoch);
            }
        }
    }

    /// Record any other frame from the peer
    pub fn record_traffic(&mut self, local_us: u64) {
        self.link.heard(local_us);
    }

    pub fn set_motor_epoch(&mut self, epoch: MotorEpoch) {
        self.epoch = Some(epoch);
    }

    /// Current epoch
    ///
    /// A Responder's frozen epoch stops being returned once the outage
    /// reaches the stale window.
    pub fn motor_epoch(&self, local_us: u64) -> Option<MotorEpoch> {
        if self.role == Role::Responder && self.link.check(local_us) == LinkStatus::Expired {
            return None;
        }
        self.epoch
    }

    pub fn link_lost(&mut self, local_us: u64) {
        self.link.link_lost(local_us);
    }

    /// Peer silent long enough to declare the link lost
    pub fn peer_overdue(&self, local_us: u64) -> bool {
        self.link.is_connected() && self.link.beacon_overdue(local_us)
    }

    pub fn link_restored(&mut self, local_us: u64) -> Reconnect {
        let expired = self.link.check(local_us) == LinkStatus::Expired;
        self.link.link_restored(local_us);
        if expired || self.epoch.is_none() {
            self.epoch = None;
            Reconnect::Restart
        } else {
            Reconnect::Resume
        }
    }

    /// The peer restarted and rejoined the running session
    ///
    /// A Responder's offset and epoch were measured against the Initiator's
    /// previous boot, so both are dropped and the handshake starts over.
    pub fn peer_rebooted(&mut self, local_us: u64) {
        self.link.link_restored(local_us);
        if self.role == Role::Responder {
            self.offset_us = 0;
            self.samples = 0;
            self.handshake_complete = false;
            self.quality = ClockQuality::default();
            self.epoch = None;
        }
    }

    /// Advisory phase-lock indication; never used for correction
    pub fn antiphase_locked(&self, local_us: u64) -> bool {
        self.role.is_paired()
            && self.handshake_complete
            && self.link.is_connected()
            && self.quality.score >= LOCK_QUALITY
            && self.motor_epoch(local_us).is_some()
    }
}

fn score_for(avg_drift_us: u32) -> u8 {
    // 0 us -> 100, 1 ms or more -> 0
    100u32.saturating_sub(avg_drift_us / 10) as u8
}
