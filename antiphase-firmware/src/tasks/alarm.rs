//! Precision alarm task
//!
//! Runs on the interrupt executor so it wakes at its target even while
//! the thread executor is busy. Its only effect is a single `TimerFired`
//! enqueue per arming.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{Instant, Timer};

use antiphase_core::state::MotorEvent;

use crate::channels::{AlarmCommand, ALARM, MOTOR_EVENTS};

fn target(cmd: AlarmCommand) -> Option<u64> {
    match cmd {
        AlarmCommand::Arm(local_us) => Some(local_us),
        AlarmCommand::Cancel => None,
    }
}

#[embassy_executor::task]
pub async fn alarm_task() {
    info!("Alarm task started");

    let mut armed: Option<u64> = None;
    loop {
        armed = match armed {
            None => target(ALARM.wait().await),
            Some(local_us) => {
                match select(ALARM.wait(), Timer::at(Instant::from_micros(local_us))).await {
                    Either::First(cmd) => target(cmd),
                    Either::Second(()) => {
                        // The motor task re-checks its deadline by polling if this is lost
                        if MOTOR_EVENTS.try_send(MotorEvent::TimerFired).is_err() {
                            trace!("Event queue full, alarm dropped");
                        }
                        None
                    }
                }
            }
        };
    }
}
