//! Radio receive task
//!
//! Parses frames from the radio modem, drops duplicate sequence numbers and
//! routes each message: clock traffic straight into the sync context,
//! `Hello` to the pairing task, everything else to the motor task.

use core::sync::atomic::Ordering;

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use antiphase_core::state::MotorEvent;
use antiphase_core::sync::MotorEpoch;
use antiphase_protocol::{CoordinationMessage, DuplicateFilter, FrameParser};

use crate::channels::{LINK_DOWN, LINK_TX, MOTOR_EVENTS, PEER_HELLO};
use crate::sync::{local_now, SYNC};

const RX_BUF_SIZE: usize = 64;

#[embassy_executor::task]
pub async fn link_rx_task(mut rx: BufferedUartRx) {
    info!("Link RX task started");

    let mut parser = FrameParser::new();
    let mut duplicates = DuplicateFilter::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        let n = match rx.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Radio read error: {:?}", e);
                continue;
            }
        };

        for &byte in &buf[..n] {
            match parser.feed(byte) {
                Ok(Some(frame)) => {
                    if !duplicates.accept(frame.seq) {
                        trace!("Duplicate frame {}", frame.seq);
                        continue;
                    }
                    match CoordinationMessage::from_frame(&frame) {
                        Ok(msg) => route(msg),
                        Err(e) => warn!("Undecodable frame: {:?}", e),
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("Frame error: {:?}", e),
            }
        }
    }
}

fn route(msg: CoordinationMessage) {
    let local = local_now();
    SYNC.with(|c| c.record_traffic(local));
    if LINK_DOWN.swap(false, Ordering::Relaxed) {
        info!("Peer heard again");
        forward(MotorEvent::LinkRestored);
    }

    match msg {
        CoordinationMessage::Hello { .. } => {
            if PEER_HELLO.try_send(msg).is_err() {
                trace!("Hello dropped, pairing not listening");
            }
        }
        CoordinationMessage::SyncRequest { t1_us } => {
            let reply = CoordinationMessage::SyncReply {
                t1_us,
                t2_us: local,
                t3_us: local_now(),
            };
            if LINK_TX.try_send(reply).is_err() {
                warn!("Radio TX queue full, sync reply dropped");
            }
        }
        CoordinationMessage::SyncReply {
            t1_us,
            t2_us,
            t3_us,
        } => {
            if !SYNC.with(|c| c.record_exchange(t1_us, t2_us, t3_us, local)) {
                debug!("Clock sample discarded");
            }
        }
        CoordinationMessage::SyncBeacon {
            epoch_us, cycle_ms, ..
        } => {
            let epoch = epoch_us.map(|e| MotorEpoch::new(e, cycle_ms));
            SYNC.with(|c| c.record_beacon(local, epoch));
        }
        other => forward(MotorEvent::Peer(other)),
    }
}

fn forward(event: MotorEvent) {
    if MOTOR_EVENTS.try_send(event).is_err() {
        warn!("Motor event queue full, dropping {:?}", event);
    }
}
