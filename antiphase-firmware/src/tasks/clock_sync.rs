//! Clock synchronization task
//!
//! Once paired, the Initiator broadcasts a beacon carrying its time and the
//! motor epoch every second; the Responder sends `SyncRequest` so its
//! offset keeps tracking drift. Both report their battery level and watch
//! for peer silence.

use core::sync::atomic::Ordering;

use defmt::*;
use embassy_time::{Duration, Ticker};

use antiphase_core::state::MotorEvent;
use antiphase_core::sync::Role;
use antiphase_protocol::CoordinationMessage;

use crate::channels::{BATTERY_PCT, LINK_DOWN, LINK_TX, MOTOR_EVENTS};
use crate::sync::{local_now, SYNC};

/// Beacon and request period
const SYNC_INTERVAL_MS: u64 = 1000;

/// Battery report every this many sync periods
const BATTERY_REPORT_TICKS: u32 = 30;

#[embassy_executor::task]
pub async fn sync_task() {
    info!("Sync task started");

    let mut ticker = Ticker::every(Duration::from_millis(SYNC_INTERVAL_MS));
    let mut ticks: u32 = 0;

    loop {
        ticker.next().await;

        let role = SYNC.with(|c| c.role());
        if !role.is_paired() {
            continue;
        }
        ticks = ticks.wrapping_add(1);

        let local = local_now();
        if !LINK_DOWN.load(Ordering::Relaxed) && SYNC.with(|c| c.peer_overdue(local)) {
            warn!("Peer silent, link lost");
            SYNC.with(|c| c.link_lost(local));
            LINK_DOWN.store(true, Ordering::Relaxed);
            if MOTOR_EVENTS.try_send(MotorEvent::LinkLost).is_err() {
                warn!("Motor event queue full, link loss not delivered");
            }
        }

        let msg = match role {
            Role::Initiator => {
                let (shared_us, epoch) = SYNC.with(|c| (c.shared_time(local), c.motor_epoch(local)));
                CoordinationMessage::SyncBeacon {
                    shared_us,
                    epoch_us: epoch.map(|e| e.epoch_us),
                    cycle_ms: epoch.map(|e| e.cycle_ms).unwrap_or(0),
                }
            }
            _ => CoordinationMessage::SyncRequest { t1_us: local },
        };
        send(msg);

        if ticks % BATTERY_REPORT_TICKS == 0 {
            send(CoordinationMessage::PeerBatteryLevel {
                pct: BATTERY_PCT.load(Ordering::Relaxed),
            });
        }
    }
}

fn send(msg: CoordinationMessage) {
    // Nothing reaches the peer during an outage, but requests are how it ends
    if LINK_TX.try_send(msg).is_err() {
        trace!("Radio TX queue full, {} skipped", msg.name());
    }
}
