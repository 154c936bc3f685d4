//! Engine collaborators backed by Embassy
//!
//! Glue between the board-agnostic engine traits and the firmware's
//! channels, watchdog and timers.

use core::sync::atomic::Ordering;

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::watchdog::Watchdog;
use embassy_time::Timer;

use antiphase_core::state::MotorEvent;
use antiphase_core::traits::{AlarmError, CoordinationLink, PrecisionAlarm, TaskRuntime};
use antiphase_protocol::{CoordinationMessage, LinkError};

use crate::channels::{AlarmCommand, ALARM, LINK_DOWN, LINK_TX, MOTOR_EVENTS};
use crate::sync::{local_now, SYNC};

/// Motor task event queue and watchdog
pub struct EmbassyRuntime<'a> {
    watchdog: &'a mut Watchdog,
}

impl<'a> EmbassyRuntime<'a> {
    pub fn new(watchdog: &'a mut Watchdog) -> Self {
        Self { watchdog }
    }
}

impl TaskRuntime for EmbassyRuntime<'_> {
    fn try_receive(&mut self) -> Option<MotorEvent> {
        MOTOR_EVENTS.try_receive().ok()
    }

    async fn receive_within(&mut self, timeout_us: u64) -> Option<MotorEvent> {
        match select(MOTOR_EVENTS.receive(), Timer::after_micros(timeout_us)).await {
            Either::First(event) => Some(event),
            Either::Second(()) => None,
        }
    }

    fn feed_watchdog(&mut self) {
        self.watchdog.feed();
    }
}

/// Outbound path through the radio TX queue
pub struct ChannelLink;

impl CoordinationLink for ChannelLink {
    fn send(&mut self, msg: CoordinationMessage) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::Disconnected);
        }
        LINK_TX.try_send(msg).map_err(|_| {
            warn!("Radio TX queue full");
            LinkError::QueueFull
        })
    }

    fn is_connected(&self) -> bool {
        !LINK_DOWN.load(Ordering::Relaxed)
    }
}

/// Precision alarm served by the interrupt-priority alarm task
pub struct AlarmHandle;

impl PrecisionAlarm for AlarmHandle {
    fn arm(&mut self, target_us: u64) -> Result<(), AlarmError> {
        let local = SYNC.with(|c| c.local_time(target_us));
        if local < local_now() {
            return Err(AlarmError::InPast);
        }
        ALARM.signal(AlarmCommand::Arm(local));
        Ok(())
    }

    fn cancel(&mut self) {
        ALARM.signal(AlarmCommand::Cancel);
    }
}
