//! Pairing task
//!
//! Broadcasts `Hello` until the peer's announcement arrives, then runs the
//! same arbitration the peer runs and hands the resulting role to the motor
//! task. The announcement is fixed for the whole attempt.
//!
//! Once paired the task stays up to answer a peer that reboots mid-session:
//! the answer carries the running role so the peer takes the other one.

use core::sync::atomic::Ordering;

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_time::{with_deadline, with_timeout, Duration, Instant, Timer};

use antiphase_core::coordination::{remote_info, session_hello, PairingSession};
use antiphase_core::engine::PAIRING_WINDOW_US;
use antiphase_core::state::{MotorEvent, SessionEvent};
use antiphase_core::sync::{PeerInfo, Role};
use antiphase_protocol::{Address, CoordinationMessage};

use crate::channels::{BATTERY_PCT, BATTERY_READY, LINK_TX, MOTOR_EVENTS, PEER_HELLO};
use crate::sync::SYNC;

/// Hello broadcast period
const HELLO_INTERVAL_MS: u64 = 500;

/// Hellos repeated after arbitration so a peer that missed ours still pairs
const TRAILING_HELLOS: u8 = 3;

/// Longest wait for the first battery sample
const BATTERY_WAIT_MS: u64 = 2000;

/// Hellos closer together than this belong to the same pairing attempt
const REJOIN_GAP_MS: u64 = 5000;

#[embassy_executor::task]
pub async fn pairing_task(address: Address) {
    let battery_pct = match with_timeout(
        Duration::from_millis(BATTERY_WAIT_MS),
        BATTERY_READY.wait(),
    )
    .await
    {
        Ok(pct) => pct,
        Err(_) => {
            warn!("No battery sample yet, announcing the last known level");
            BATTERY_PCT.load(Ordering::Relaxed)
        }
    };

    // Roles are not kept across power cycles
    let session = PairingSession::new(PeerInfo {
        address,
        battery_pct,
        preserved: Role::None,
    });
    let local = session.local();
    info!("Pairing as {:02x} at {}%", local.address, local.battery_pct);

    let deadline = Instant::now() + Duration::from_micros(PAIRING_WINDOW_US);
    let role = match with_deadline(deadline, find_peer(&session)).await {
        Ok(Role::None) => {
            error!("Peer reports our own address, cannot pick roles");
            Role::None
        }
        Ok(role) => {
            for _ in 0..TRAILING_HELLOS {
                send(session.hello());
                Timer::after_millis(HELLO_INTERVAL_MS).await;
            }
            info!("Paired as {:?}", role);
            role
        }
        Err(_) => {
            warn!("No peer within pairing window");
            Role::None
        }
    };

    let event = match role {
        Role::None => SessionEvent::PairingFailed,
        role => SessionEvent::PairingComplete { role },
    };
    MOTOR_EVENTS.send(MotorEvent::Session(event)).await;

    if role.is_paired() {
        answer_rejoins(address).await;
    }
}

async fn find_peer(session: &PairingSession) -> Role {
    loop {
        send(session.hello());

        match select(
            PEER_HELLO.receive(),
            Timer::after_millis(HELLO_INTERVAL_MS),
        )
        .await
        {
            Either::First(msg) => {
                if let Some(remote) = remote_info(&msg) {
                    debug!("Peer hello {:02x} at {}%", remote.address, remote.battery_pct);
                }
                if let Some(role) = session.on_hello(&msg) {
                    return role;
                }
            }
            Either::Second(()) => {}
        }
    }
}

/// Answer Hellos from a peer pairing from scratch while our session runs
async fn answer_rejoins(address: Address) -> ! {
    // The peer's trailing Hellos from the pairing just finished
    let mut last_hello = Instant::now();

    loop {
        let msg = PEER_HELLO.receive().await;
        let Some(remote) = remote_info(&msg) else {
            continue;
        };
        // A peer already in a session is answering us
        if remote.preserved.is_paired() {
            continue;
        }

        let role = SYNC.with(|c| c.role());
        if !role.is_paired() {
            continue;
        }

        let now = Instant::now();
        let fresh = now - last_hello >= Duration::from_millis(REJOIN_GAP_MS);
        last_hello = now;

        send(session_hello(
            address,
            BATTERY_PCT.load(Ordering::Relaxed),
            role,
        ));
        if fresh {
            warn!("Peer {:02x} is pairing again, keeping {:?}", remote.address, role);
            MOTOR_EVENTS
                .send(MotorEvent::Session(SessionEvent::PeerRejoined))
                .await;
        }
    }
}

fn send(hello: CoordinationMessage) {
    if LINK_TX.try_send(hello).is_err() {
        trace!("Radio TX queue full, hello skipped");
    }
}
