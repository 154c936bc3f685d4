//! Deterministic simulation of one unit's surroundings
//!
//! Time only moves when the engine waits. Scripted events are delivered at
//! their local timestamps; everything the engine does is recorded.

use core::cell::{Cell, RefCell};
use std::vec::Vec;

use antiphase_protocol::{CoordinationMessage, LinkError};

use crate::config::SessionConfig;
use crate::mode::Mode;
use crate::state::MotorEvent;
use crate::sync::{ClockQuality, MotorEpoch, Reconnect, Role, SyncContext};
use crate::traits::{
    AlarmError, ClockSync, CoordinationLink, HapticOutput, Indicator, PrecisionAlarm,
    SettingsProvider, TaskRuntime,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputAction {
    Forward(u8),
    Reverse(u8),
    Coast,
    Indicator(Indicator),
}

pub struct SimWorld {
    local_us: Cell<u64>,
    ctx: RefCell<SyncContext>,
    script: RefCell<Vec<(u64, MotorEvent)>>,
    settings: RefCell<Vec<(u64, SessionConfig)>>,
    sent: RefCell<Vec<(u64, CoordinationMessage)>>,
    outputs: RefCell<Vec<(u64, OutputAction)>>,
    alarms: RefCell<Vec<u64>>,
    committed: RefCell<Vec<Mode>>,
    feeds: Cell<u32>,
    connected: Cell<bool>,
}

impl SimWorld {
    pub fn new(role: Role) -> Self {
        let mut ctx = SyncContext::new();
        ctx.begin_session(role);
        Self {
            local_us: Cell::new(0),
            ctx: RefCell::new(ctx),
            script: RefCell::new(Vec::new()),
            settings: RefCell::new(std::vec![(0, SessionConfig::default())]),
            sent: RefCell::new(Vec::new()),
            outputs: RefCell::new(Vec::new()),
            alarms: RefCell::new(Vec::new()),
            committed: RefCell::new(Vec::new()),
            feeds: Cell::new(0),
            connected: Cell::new(true),
        }
    }

    /// Responder with a zero-offset handshake already done
    pub fn synced_responder() -> Self {
        let world = Self::new(Role::Responder);
        world.ctx.borrow_mut().record_exchange(0, 0, 0, 0);
        world
    }

    pub fn now(&self) -> u64 {
        self.local_us.get()
    }

    pub fn set_time(&self, local_us: u64) {
        self.local_us.set(local_us);
    }

    /// Deliver `event` at local time `at_us`
    pub fn schedule(&self, at_us: u64, event: MotorEvent) {
        let mut script = self.script.borrow_mut();
        let pos = script.partition_point(|(t, _)| *t <= at_us);
        script.insert(pos, (at_us, event));
    }

    /// Settings returned from `at_us` on
    pub fn change_settings(&self, at_us: u64, config: SessionConfig) {
        let mut settings = self.settings.borrow_mut();
        let pos = settings.partition_point(|(t, _)| *t <= at_us);
        settings.insert(pos, (at_us, config));
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    pub fn with_ctx<T>(&self, f: impl FnOnce(&mut SyncContext) -> T) -> T {
        f(&mut self.ctx.borrow_mut())
    }

    pub fn runtime(&self) -> SimRuntime<'_> {
        SimRuntime { world: self }
    }

    pub fn link(&self) -> SimLink<'_> {
        SimLink { world: self }
    }

    pub fn output(&self) -> SimOutput<'_> {
        SimOutput { world: self }
    }

    pub fn alarm(&self) -> SimAlarm<'_> {
        SimAlarm { world: self }
    }

    pub fn settings(&self) -> SimSettings<'_> {
        SimSettings { world: self }
    }

    pub fn sent(&self) -> Vec<(u64, CoordinationMessage)> {
        self.sent.borrow().clone()
    }

    pub fn outputs(&self) -> Vec<(u64, OutputAction)> {
        self.outputs.borrow().clone()
    }

    /// Times the motor started driving
    pub fn drive_times(&self) -> Vec<u64> {
        self.outputs
            .borrow()
            .iter()
            .filter(|(_, a)| matches!(a, OutputAction::Forward(_) | OutputAction::Reverse(_)))
            .map(|(t, _)| *t)
            .collect()
    }

    pub fn alarms(&self) -> Vec<u64> {
        self.alarms.borrow().clone()
    }

    /// Modes the engine reported as running, in order
    pub fn committed_modes(&self) -> Vec<Mode> {
        self.committed.borrow().clone()
    }

    pub fn watchdog_feeds(&self) -> u32 {
        self.feeds.get()
    }

    fn next_event_before(&self, until_us: u64) -> Option<(u64, MotorEvent)> {
        let mut script = self.script.borrow_mut();
        match script.first() {
            Some((t, _)) if *t <= until_us => Some(script.remove(0)),
            _ => None,
        }
    }
}

impl ClockSync for SimWorld {
    fn now_us(&self) -> u64 {
        self.ctx.borrow().shared_time(self.now())
    }

    fn role(&self) -> Role {
        self.ctx.borrow().role()
    }

    fn begin_session(&self, role: Role) {
        self.ctx.borrow_mut().begin_session(role)
    }

    fn end_session(&self) {
        self.ctx.borrow_mut().end_session()
    }

    fn motor_epoch(&self) -> Option<MotorEpoch> {
        self.ctx.borrow().motor_epoch(self.now())
    }

    fn set_motor_epoch(&self, epoch: MotorEpoch) {
        self.ctx.borrow_mut().set_motor_epoch(epoch)
    }

    fn clock_offset_us(&self) -> i64 {
        self.ctx.borrow().clock_offset_us()
    }

    fn quality(&self) -> ClockQuality {
        self.ctx.borrow().quality()
    }

    fn handshake_complete(&self) -> bool {
        self.ctx.borrow().handshake_complete()
    }

    fn antiphase_locked(&self) -> bool {
        self.ctx.borrow().antiphase_locked(self.now())
    }

    fn link_lost(&self) {
        self.ctx.borrow_mut().link_lost(self.now())
    }

    fn link_restored(&self) -> Reconnect {
        self.ctx.borrow_mut().link_restored(self.now())
    }

    fn peer_rebooted(&self) {
        self.ctx.borrow_mut().peer_rebooted(self.now())
    }
}

pub struct SimRuntime<'a> {
    world: &'a SimWorld,
}

impl TaskRuntime for SimRuntime<'_> {
    fn try_receive(&mut self) -> Option<MotorEvent> {
        self.world
            .next_event_before(self.world.now())
            .map(|(_, event)| event)
    }

    async fn receive_within(&mut self, timeout_us: u64) -> Option<MotorEvent> {
        let now = self.world.now();
        let until = now + timeout_us;
        match self.world.next_event_before(until) {
            Some((t, event)) => {
                self.world.set_time(t.max(now));
                Some(event)
            }
            None => {
                self.world.set_time(until);
                None
            }
        }
    }

    fn feed_watchdog(&mut self) {
        self.world.feeds.set(self.world.feeds.get() + 1);
    }
}

pub struct SimLink<'a> {
    world: &'a SimWorld,
}

impl CoordinationLink for SimLink<'_> {
    fn send(&mut self, msg: CoordinationMessage) -> Result<(), LinkError> {
        if !self.world.connected.get() {
            return Err(LinkError::Disconnected);
        }
        self.world.sent.borrow_mut().push((self.world.now(), msg));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.world.connected.get()
    }
}

pub struct SimOutput<'a> {
    world: &'a SimWorld,
}

impl SimOutput<'_> {
    fn record(&self, action: OutputAction) {
        self.world
            .outputs
            .borrow_mut()
            .push((self.world.now(), action));
    }
}

impl HapticOutput for SimOutput<'_> {
    fn drive_forward(&mut self, intensity_pct: u8) {
        self.record(OutputAction::Forward(intensity_pct));
    }

    fn drive_reverse(&mut self, intensity_pct: u8) {
        self.record(OutputAction::Reverse(intensity_pct));
    }

    fn coast(&mut self) {
        self.record(OutputAction::Coast);
    }

    fn set_indicator(&mut self, indicator: Indicator) {
        self.record(OutputAction::Indicator(indicator));
    }
}

pub struct SimAlarm<'a> {
    world: &'a SimWorld,
}

impl PrecisionAlarm for SimAlarm<'_> {
    fn arm(&mut self, target_us: u64) -> Result<(), AlarmError> {
        self.cancel();
        let local = self.world.ctx.borrow().local_time(target_us);
        if local < self.world.now() {
            return Err(AlarmError::InPast);
        }
        self.world.alarms.borrow_mut().push(target_us);
        self.world.schedule(local, MotorEvent::TimerFired);
        Ok(())
    }

    fn cancel(&mut self) {
        self.world
            .script
            .borrow_mut()
            .retain(|(_, e)| *e != MotorEvent::TimerFired);
    }
}

pub struct SimSettings<'a> {
    world: &'a SimWorld,
}

impl SettingsProvider for SimSettings<'_> {
    fn snapshot(&self) -> SessionConfig {
        let now = self.world.now();
        self.world
            .settings
            .borrow()
            .iter()
            .rev()
            .find(|(t, _)| *t <= now)
            .map(|(_, c)| *c)
            .unwrap_or_default()
    }

    fn mode_committed(&self, mode: Mode) {
        self.world.committed.borrow_mut().push(mode);
    }
}
