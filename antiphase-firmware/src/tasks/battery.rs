//! Battery monitor task
//!
//! Samples the cell every ten seconds. The first sample releases the
//! pairing task; a reading under the cutoff ends the session.

use core::sync::atomic::Ordering;

use defmt::*;
use embassy_rp::adc::{Adc, Async, Channel};
use embassy_time::{Duration, Ticker};

use antiphase_core::state::{MotorEvent, SessionEvent};
use antiphase_drivers::battery::{BatteryGauge, CellState, CUTOFF_MV};

use crate::channels::{BATTERY_PCT, BATTERY_READY, MOTOR_EVENTS};

const SAMPLE_INTERVAL_MS: u64 = 10_000;

/// Below this a warning is logged on every sample
const LOW_BATTERY_PCT: u8 = 15;

#[embassy_executor::task]
pub async fn battery_task(mut adc: Adc<'static, Async>, mut channel: Channel<'static>) {
    let gauge = BatteryGauge::default();
    let mut ticker = Ticker::every(Duration::from_millis(SAMPLE_INTERVAL_MS));
    let mut sampled = false;
    let mut cut_off = false;

    loop {
        match adc.read(&mut channel).await {
            Ok(raw) => {
                let mv = gauge.cell_mv(raw);
                let pct = gauge.percent(raw);
                let previous = BATTERY_PCT.swap(pct, Ordering::Relaxed);
                if !sampled {
                    info!("Battery {}mV, {}%", mv, pct);
                    BATTERY_READY.signal(pct);
                    sampled = true;
                } else if pct != previous {
                    debug!("Battery {}mV, {}%", mv, pct);
                }

                match gauge.state(raw) {
                    CellState::Cutoff if !cut_off => {
                        error!("Cell at {}mV, under the {}mV cutoff", mv, CUTOFF_MV);
                        cut_off = true;
                        MOTOR_EVENTS
                            .send(MotorEvent::Session(SessionEvent::LowBattery))
                            .await;
                    }
                    CellState::Ok if pct < LOW_BATTERY_PCT => warn!("Battery low: {}%", pct),
                    _ => {}
                }
            }
            Err(e) => warn!("Battery ADC read failed: {:?}", e),
        }
        ticker.next().await;
    }
}
