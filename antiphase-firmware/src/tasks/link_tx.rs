//! Radio transmit task
//!
//! Frames outbound coordination messages with a wrapping sequence number
//! and writes them to the radio modem UART.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use antiphase_protocol::{CoordinationMessage, LinkError, SequenceCounter, MAX_FRAME_SIZE};

use crate::channels::LINK_TX;

fn encode(msg: &CoordinationMessage, seq: u8, buf: &mut [u8]) -> Result<usize, LinkError> {
    let frame = msg.to_frame(seq)?;
    Ok(frame.encode(buf)?)
}

#[embassy_executor::task]
pub async fn link_tx_task(mut tx: BufferedUartTx) {
    info!("Link TX task started");

    let mut seq = SequenceCounter::new();
    let mut buf = [0u8; MAX_FRAME_SIZE];

    loop {
        let msg = LINK_TX.receive().await;
        match encode(&msg, seq.advance(), &mut buf) {
            Ok(len) => {
                if let Err(e) = tx.write_all(&buf[..len]).await {
                    warn!("Radio write failed: {:?}", e);
                } else {
                    trace!("TX {}", msg.name());
                }
            }
            Err(e) => warn!("Cannot frame {}: {:?}", msg.name(), e),
        }
    }
}
